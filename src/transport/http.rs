// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::{
    error::{Error, Result},
    metadata,
};

use super::{Method, Request, Transport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct Http {
    client: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
}

impl Http {
    pub(crate) fn new(mut base_url: Url) -> Result<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            bearer: RwLock::new(None),
        })
    }

    /// Appends the request's segments to the base URL, percent-encoding each
    /// one.
    fn url(&self, req: &Request) -> Result<Url> {
        let mut url = self.base_url.clone();
        _ = url
            .path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(&req.segments);
        Ok(url)
    }
}

/// Extracts the `message` field the API attaches to error bodies.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

#[async_trait]
impl Transport for Http {
    async fn send(&self, req: Request) -> Result<Value> {
        let url = self.url(&req)?;
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(USER_AGENT, metadata::USER_AGENT.as_str());
        for (name, value) in req.headers {
            builder = builder.header(name, value);
        }
        if req.authenticated {
            if let Some(token) = self.bearer.read().await.as_ref() {
                builder = builder.bearer_auth(token.expose_secret());
            }
        }
        if let Some(body) = req.body.as_ref() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    async fn set_bearer(&self, token: Option<SecretString>) {
        *self.bearer.write().await = token;
    }

    async fn bearer(&self) -> Option<SecretString> {
        self.bearer.read().await.clone()
    }
}
