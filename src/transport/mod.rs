// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod http;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::error::Result;

pub(crate) use http::Http;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    Get,
    Post,
    Put,
}

/// A request against the venue REST API. The path is kept as unencoded
/// segments relative to the API base URL.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) segments: Vec<String>,
    pub(crate) body: Option<Value>,
    pub(crate) headers: Vec<(&'static str, &'static str)>,
    pub(crate) authenticated: bool,
}

impl Request {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
            body: None,
            headers: vec![],
            authenticated: true,
        }
    }

    pub(crate) fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub(crate) fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    pub(crate) fn put(path: &str) -> Self {
        Self::new(Method::Put, path)
    }

    /// Appends a path segment taken verbatim. Characters such as `/` or `?`
    /// stay part of the segment.
    pub(crate) fn with_segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_owned());
        self
    }

    /// The unencoded path, for logging and matching.
    pub(crate) fn path(&self) -> String {
        self.segments.join("/")
    }

    pub(crate) fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Sends the request without the bearer token even if one is set.
    pub(crate) fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[async_trait]
pub(crate) trait Transport: Send + Sync {
    /// Sends a request and returns the decoded JSON body, or `Value::Null` for
    /// an empty body. Non-success statuses are reported as
    /// [`crate::error::Error::Status`].
    async fn send(&self, req: Request) -> Result<Value>;

    /// Replaces the bearer token attached to authenticated requests.
    async fn set_bearer(&self, token: Option<SecretString>);

    async fn bearer(&self) -> Option<SecretString>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, req: Request) -> Result<Value> {
        (**self).send(req).await
    }

    async fn set_bearer(&self, token: Option<SecretString>) {
        (**self).set_bearer(token).await;
    }

    async fn bearer(&self) -> Option<SecretString> {
        (**self).bearer().await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, req: Request) -> Result<Value> {
        (**self).send(req).await
    }

    async fn set_bearer(&self, token: Option<SecretString>) {
        (**self).set_bearer(token).await;
    }

    async fn bearer(&self) -> Option<SecretString> {
        (**self).bearer().await
    }
}
