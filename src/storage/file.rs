// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::warn;
use serde_json::{Map, Value};

use crate::{error::Result, metadata};

use super::{Scope, Storage};

/// Storage backed by one JSON document per scope.
pub(crate) struct File {
    session: PathBuf,
    durable: PathBuf,
}

impl File {
    /// Places the durable document in the platform data directory and the
    /// session document in the platform cache directory.
    pub(crate) fn new() -> Option<Self> {
        metadata::PROJECT_DIRS.as_ref().map(|dirs| Self {
            session: dirs.cache_dir().join("session.json"),
            durable: dirs.data_dir().join("durable.json"),
        })
    }

    pub(crate) fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            session: dir.as_ref().join("session.json"),
            durable: dir.as_ref().join("durable.json"),
        }
    }

    fn path(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Session => &self.session,
            Scope::Durable => &self.durable,
        }
    }

    /// Reads the document for `scope`. A document that cannot be decoded is
    /// treated as empty and replaced on the next write.
    fn load(&self, scope: Scope) -> Result<Map<String, Value>> {
        let path = self.path(scope);
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!("Ignoring the {} store at {}: not a JSON object", scope, path.display());
                Ok(Map::new())
            }
            Err(e) => {
                warn!("Ignoring the unreadable {} store at {}: {}", scope, path.display(), e);
                Ok(Map::new())
            }
        }
    }

    /// Writes the document for `scope` through a temporary file so readers
    /// never see a partial document.
    fn save(&self, scope: Scope, data: &Map<String, Value>) -> Result<()> {
        let path = self.path(scope);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(data)?)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for File {
    async fn get(&mut self, scope: Scope, key: &str) -> Result<Option<String>> {
        Ok(self.load(scope)?.get(key).and_then(|value| match *value {
            Value::String(ref s) => Some(s.clone()),
            Value::Null => None,
            _ => Some(value.to_string()),
        }))
    }

    async fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()> {
        let mut data = self.load(scope)?;
        let _previous = data.insert(key.to_owned(), Value::String(value.to_owned()));
        self.save(scope, &data)
    }

    async fn remove(&mut self, scope: Scope, key: &str) -> Result<()> {
        let mut data = self.load(scope)?;
        if data.remove(key).is_some() {
            self.save(scope, &data)?;
        }
        Ok(())
    }

    async fn keys(&mut self, scope: Scope) -> Result<Vec<String>> {
        Ok(self.load(scope)?.keys().cloned().collect())
    }

    async fn clear(&mut self, scope: Scope) -> Result<()> {
        match fs::remove_file(self.path(scope)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
