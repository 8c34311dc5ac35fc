// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::lock::Mutex;
use log::error;
use secrecy::SecretString;
use tabled::{settings::Style, Table, Tabled};

use crate::{
    analytics::Sink,
    auth,
    clock::Clock,
    error::{self, Result},
    notify::Notifier,
    password::Prompt as _,
    storage::Storage,
    transport::Transport,
};

pub(crate) mod capture;
pub(crate) mod lead;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod password;
pub(crate) mod profile;
pub(crate) mod referral;
pub(crate) mod session;
pub(crate) mod status;

/// The collaborators a command runs against.
pub(crate) struct Context {
    pub(crate) storage: Arc<Mutex<Box<dyn Storage>>>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) prompt: Arc<dyn crate::password::Prompt>,
}

impl Context {
    pub(crate) fn tracker(&self) -> crate::referral::Tracker {
        crate::referral::Tracker::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.transport),
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
        )
    }

    pub(crate) fn session(&self) -> auth::Session {
        auth::Session::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.transport),
            Arc::clone(&self.notifier),
            Arc::clone(&self.clock),
        )
    }

    /// A session restored from storage and confirmed with the server.
    pub(crate) async fn verified_session(&self) -> Result<auth::Session> {
        let session = self.session();
        if session.restore().await && session.verify_token().await == auth::Verification::Verified
        {
            Ok(session)
        } else {
            error!("You are not logged in; run the login command first");
            Err(error::Error::Command)
        }
    }

    pub(crate) async fn secret(&self, req: crate::password::Request) -> Result<SecretString> {
        self.prompt.prompt(req).await?.ok_or(error::Error::Cancelled)
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: Context) -> Result<()>;
}

/// One row of a two-column property listing.
#[derive(Clone, Debug, Tabled)]
pub(crate) struct Field {
    #[tabled(rename = "Field")]
    pub(crate) name: &'static str,
    #[tabled(rename = "Value")]
    pub(crate) value: String,
}

impl Field {
    pub(crate) fn new<V: ToString>(name: &'static str, value: V) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }

    pub(crate) fn optional(name: &'static str, value: Option<&str>) -> Self {
        Self::new(name, value.unwrap_or("-"))
    }
}

pub(crate) fn print_fields(fields: Vec<Field>) {
    println!("{}", Table::new(fields).with(Style::rounded()));
}

/// Splits a `key=value` argument. The value is read as JSON when it parses
/// and kept as a string otherwise.
pub(crate) fn parse_param(raw: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("missing key in {raw:?}"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn params_parse_json_or_fall_back_to_strings() {
        assert_eq!(
            parse_param("name=Jess Smith"),
            Ok(("name".to_owned(), json!("Jess Smith")))
        );
        assert_eq!(parse_param("guests=120"), Ok(("guests".to_owned(), json!(120))));
        assert_eq!(
            parse_param("flag=false"),
            Ok(("flag".to_owned(), json!(false)))
        );
        assert_eq!(parse_param("empty="), Ok(("empty".to_owned(), json!(""))));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
