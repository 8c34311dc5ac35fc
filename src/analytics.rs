// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs::OpenOptions,
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

pub(crate) const PARTNER_VISIT: &str = "partner_visit";
pub(crate) const PARTNER_CONVERSION: &str = "partner_conversion";
pub(crate) const PAGE_VIEW: &str = "page_view";
pub(crate) const LEAD_SUBMIT: &str = "lead_submit";

/// A single analytics event in the shape pushed onto a tag manager data
/// layer: the event name next to a flat set of parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Event {
    #[serde(rename = "event")]
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) params: Map<String, Value>,
}

impl Event {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            params: Map::new(),
        }
    }

    pub(crate) fn with<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        let _previous = self.params.insert(key.to_owned(), value.into());
        self
    }

    /// Merges `params` into the event. Keys already present are overwritten.
    pub(crate) fn merge(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    #[cfg(test)]
    pub(crate) fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Receives analytics events. Delivery is best-effort; sinks report their own
/// failures through the log and never to the caller.
pub(crate) trait Sink: Send + Sync {
    fn track(&self, event: &Event);
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn track(&self, event: &Event) {
        (**self).track(event);
    }
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn track(&self, event: &Event) {
        (**self).track(event);
    }
}

impl<T: Sink> Sink for Vec<T> {
    fn track(&self, event: &Event) {
        for sink in self {
            sink.track(event);
        }
    }
}

/// Writes each event to the log at `info` level.
pub(crate) struct Log;

impl Sink for Log {
    fn track(&self, event: &Event) {
        match serde_json::to_string(&event.params) {
            Ok(params) => info!("analytics event {}: {}", event.name, params),
            Err(e) => warn!("Could not encode analytics event {}: {}", event.name, e),
        }
    }
}

/// Appends events as JSON lines to a file for later upload.
pub(crate) struct DataLayer {
    path: PathBuf,
}

impl DataLayer {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    fn push(&self, event: &Event) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}

impl Sink for DataLayer {
    fn track(&self, event: &Event) {
        if let Err(e) = self.push(event) {
            warn!(
                "Could not record analytics event {} in {}: {}",
                event.name,
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_ser_tokens, Token};

    use super::*;

    #[test]
    fn serializes_flat_like_a_data_layer_push() {
        let event = Event::new(PAGE_VIEW).with("page_path", "/weddings");

        assert_ser_tokens(
            &event,
            &[
                Token::Map { len: None },
                Token::Str("event"),
                Token::Str("page_view"),
                Token::Str("page_path"),
                Token::Str("/weddings"),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn merge_overwrites_existing_params() {
        let mut extra = Map::new();
        let _previous = extra.insert("value".to_owned(), Value::from(5));
        let event = Event::new(LEAD_SUBMIT).with("value", 1).merge(extra);

        assert_eq!(event.param("value"), Some(&Value::from(5)));
    }

    #[test]
    fn data_layer_appends_json_lines() -> crate::error::Result<()> {
        let path = std::env::temp_dir().join(format!(
            "whitebarn-datalayer-{}.jsonl",
            std::process::id()
        ));
        let _ignored = std::fs::remove_file(&path);
        let sink = DataLayer::new(&path);

        sink.track(&Event::new(PARTNER_VISIT).with("ref_code", "ABC"));
        sink.track(&Event::new(PAGE_VIEW));

        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"event":"partner_visit","ref_code":"ABC"}"#,
                r#"{"event":"page_view"}"#
            ]
        );

        std::fs::remove_file(&path)?;
        Ok(())
    }
}
