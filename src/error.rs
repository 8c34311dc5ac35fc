// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{convert::Infallible, io, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("server responded with status {}{}", .status, .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("invalid response from server: {0}")]
    InvalidResponse(&'static str),
    #[error("no usable admin token is stored")]
    MissingToken,
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("{0}")]
    Auth(#[from] crate::auth::Failure),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// The message the server attached to a failed response, if any.
    pub(crate) fn server_message(&self) -> Option<&str> {
        match *self {
            Self::Status {
                message: Some(ref message),
                ..
            } => Some(message),
            Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Url(_)
            | Self::Status { message: None, .. }
            | Self::InvalidResponse(_)
            | Self::MissingToken
            | Self::Storage(_)
            | Self::Auth(_)
            | Self::Command
            | Self::Cancelled => None,
        }
    }

    /// Whether the server rejected our credentials. Any such response ends
    /// the current admin session.
    pub(crate) const fn is_unauthorized(&self) -> bool {
        matches!(*self, Self::Status { status: 401 | 403, .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Io(io::Error::new(io::ErrorKind::Other, value.to_string())),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no data directory is available for persistent storage")]
    NoDataDir,
}
