use parking_lot::RwLock;
use std::collections::HashMap;

use super::{upsert, CacheEntry, CacheStorage};
use crate::worker::error::WorkerError;
use crate::worker::message::{CachedResponse, RequestKey};

/// Cache namespaces that live as long as the process.
#[derive(Default)]
pub struct MemoryCacheStorage {
    namespaces: RwLock<HashMap<String, Vec<CacheEntry>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn namespaces(&self) -> Result<Vec<String>, WorkerError> {
        let mut names: Vec<String> = self.namespaces.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn lookup(
        &self,
        namespace: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, WorkerError> {
        Ok(self.namespaces.read().get(namespace).and_then(|entries| {
            entries
                .iter()
                .find(|e| &e.key == key)
                .map(|e| e.response.clone())
        }))
    }

    async fn put(&self, namespace: &str, entry: CacheEntry) -> Result<(), WorkerError> {
        let mut namespaces = self.namespaces.write();
        upsert(namespaces.entry(namespace.to_string()).or_default(), entry);
        Ok(())
    }

    async fn replace(&self, namespace: &str, entries: Vec<CacheEntry>) -> Result<(), WorkerError> {
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            upsert(&mut stored, entry);
        }
        self.namespaces.write().insert(namespace.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, WorkerError> {
        Ok(self.namespaces.write().remove(namespace).is_some())
    }
}
