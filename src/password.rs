// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Secret entry for the admin commands. Pinentry is tried first and the
//! terminal is the fallback.

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::task;

use crate::{error::Result, metadata};

/// What to ask for, and the outcome of the previous attempt if it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    label: String,
    error: Option<String>,
}

impl Request {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            error: None,
        }
    }

    pub(crate) fn with_error(self, error: &str) -> Self {
        Self {
            error: Some(error.to_owned()),
            ..self
        }
    }
}

/// A source of secrets. `Ok(None)` means the source is unavailable and the
/// next one should be asked.
#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

/// Asks each prompt in turn until one answers or fails.
#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let Some(secret) = candidate.prompt(req.clone()).await? {
                return Ok(Some(secret));
            }
        }
        Ok(None)
    }
}

/// Asks through a Pinentry program, the configured one or the first found on
/// the search path.
pub(crate) struct PinentryPrompt {
    program: Option<PathBuf>,
}

impl PinentryPrompt {
    pub(crate) const fn new(program: Option<PathBuf>) -> Self {
        Self { program }
    }
}

fn interact<'a>(
    mut input: pinentry::PassphraseInput<'a>,
    title: &'a str,
    req: &'a Request,
) -> std::result::Result<SecretString, pinentry::Error> {
    _ = input
        .required("A value is required to continue.")
        .with_title(title)
        .with_prompt(&req.label);
    if let Some(ref error) = req.error {
        _ = input.with_error(error);
    }
    input.interact()
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        let input = match self.program {
            Some(ref program) => pinentry::PassphraseInput::with_binary(program),
            None => pinentry::PassphraseInput::with_default_binary(),
        };
        let Some(input) = input else {
            return Ok(None);
        };

        let secret = task::spawn_blocking(move || {
            let title = format!("{} - {}", *metadata::CLIENT_DISPLAY_NAME, req.label);
            interact(input, &title, &req)
        })
        .await??;
        Ok(Some(secret))
    }
}

/// Reads from the controlling terminal without echo.
pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(ref error) = req.error {
            eprintln!("{error}");
        }

        let secret = task::spawn_blocking(move || {
            rpassword::prompt_password(format!("{}: ", req.label)).map(SecretString::new)
        })
        .await??;
        Ok(Some(secret))
    }
}
