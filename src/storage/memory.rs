// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::{Scope, Storage};

type Scopes = HashMap<Scope, HashMap<String, String>>;

/// Process-local storage. Clones share the same underlying data.
#[derive(Clone)]
pub(crate) struct Memory {
    data: Arc<RwLock<Scopes>>,
    writes: Arc<AtomicUsize>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The number of mutating operations performed so far.
    #[cfg(test)]
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        let _previous = self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for Memory {
    async fn get(&mut self, scope: Scope, key: &str) -> Result<Option<String>> {
        let data = Arc::clone(&self.data);
        let guard = data.read().await;
        Ok(guard.get(&scope).and_then(|values| values.get(key)).cloned())
    }

    async fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()> {
        let target_data = Arc::clone(&self.data);
        let mut guard = target_data.write_owned().await;
        let _previous = guard
            .entry(scope)
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        self.record_write();
        Ok(())
    }

    async fn remove(&mut self, scope: Scope, key: &str) -> Result<()> {
        let target_data = Arc::clone(&self.data);
        let mut guard = target_data.write_owned().await;
        if let Some(values) = guard.get_mut(&scope) {
            let _previous = values.remove(key);
        }
        self.record_write();
        Ok(())
    }

    async fn keys(&mut self, scope: Scope) -> Result<Vec<String>> {
        let data = Arc::clone(&self.data);
        let guard = data.read().await;
        Ok(guard
            .get(&scope)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&mut self, scope: Scope) -> Result<()> {
        let target_data = Arc::clone(&self.data);
        let mut guard = target_data.write_owned().await;
        let _previous = guard.remove(&scope);
        self.record_write();
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }
}
