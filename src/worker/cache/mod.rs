mod file;
mod memory;

pub use file::FileCacheStorage;
pub use memory::MemoryCacheStorage;

use serde::{Deserialize, Serialize};

use super::error::WorkerError;
use super::message::{CachedResponse, RequestKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: CachedResponse,
}

/// Named cache namespaces holding request/response pairs.
#[async_trait::async_trait]
pub trait CacheStorage: Sync + Send + 'static {
    async fn namespaces(&self) -> Result<Vec<String>, WorkerError>;
    async fn lookup(
        &self,
        namespace: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, WorkerError>;
    async fn put(&self, namespace: &str, entry: CacheEntry) -> Result<(), WorkerError>;
    /// Makes `entries` the whole content of the namespace, or changes nothing.
    async fn replace(&self, namespace: &str, entries: Vec<CacheEntry>) -> Result<(), WorkerError>;
    /// Returns false when the namespace did not exist.
    async fn delete(&self, namespace: &str) -> Result<bool, WorkerError>;
}

fn upsert(entries: &mut Vec<CacheEntry>, entry: CacheEntry) {
    match entries.iter_mut().find(|e| e.key == entry.key) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}
