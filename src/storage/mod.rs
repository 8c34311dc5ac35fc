// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

pub(crate) use file::File;
pub(crate) use memory::Memory;

/// The lifetime of a stored value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Scope {
    /// Cleared when the browsing session ends.
    Session,
    /// Survives across sessions.
    Durable,
}

impl Scope {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Durable => "durable",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub(crate) trait Storage: Send + Sync {
    async fn get(&mut self, scope: Scope, key: &str) -> Result<Option<String>>;
    async fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()>;
    async fn remove(&mut self, scope: Scope, key: &str) -> Result<()>;
    async fn keys(&mut self, scope: Scope) -> Result<Vec<String>>;
    async fn clear(&mut self, scope: Scope) -> Result<()>;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Box<T> {
    async fn get(&mut self, scope: Scope, key: &str) -> Result<Option<String>> {
        (**self).get(scope, key).await
    }

    async fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()> {
        (**self).set(scope, key, value).await
    }

    async fn remove(&mut self, scope: Scope, key: &str) -> Result<()> {
        (**self).remove(scope, key).await
    }

    async fn keys(&mut self, scope: Scope) -> Result<Vec<String>> {
        (**self).keys(scope).await
    }

    async fn clear(&mut self, scope: Scope) -> Result<()> {
        (**self).clear(scope).await
    }
}

/// Reads and decodes a JSON value stored under `key`.
pub(crate) async fn get_json<T, S>(storage: &mut S, scope: Scope, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    match storage.get(scope, key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`.
pub(crate) async fn set_json<T, S>(storage: &mut S, scope: Scope, key: &str, value: &T) -> Result<()>
where
    T: Serialize + Sync + ?Sized,
    S: Storage + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    storage.set(scope, key, &raw).await
}
