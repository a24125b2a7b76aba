use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::StorageError;
use super::RecordStorage;

pub struct MemoryRecordStorage {
    records: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryRecordStorage {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            reject_writes: AtomicBool::new(false),
        }
    }

    pub fn with_record(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .records
            .lock()
            .insert(key.to_string(), value.to_string());
        storage
    }

    /// Makes every following write fail as if the quota was exhausted.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Release);
    }

    pub fn record(&self, key: &str) -> Option<String> {
        self.records.lock().get(key).cloned()
    }
}

#[async_trait::async_trait]
impl RecordStorage for MemoryRecordStorage {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn store(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::Acquire) {
            return Err(StorageError::Write(
                PathBuf::from(key),
                io::Error::new(io::ErrorKind::Other, "storage quota exceeded"),
            ));
        }
        self.records.lock().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store() {
        // GIVEN
        let storage = MemoryRecordStorage::new();

        // WHEN
        storage.store("tasks", "[]".to_string()).await.unwrap();

        // THEN
        assert_eq!(storage.fetch("tasks").await.unwrap(), Some("[]".to_string()));
        assert_eq!(storage.fetch("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_previous_value() {
        // GIVEN
        let storage = MemoryRecordStorage::with_record("tasks", "[]");
        storage.reject_writes(true);

        // WHEN
        let res = storage.store("tasks", "[1]".to_string()).await.unwrap_err();

        // THEN
        assert!(matches!(res, StorageError::Write(_, _)));
        assert_eq!(storage.record("tasks"), Some("[]".to_string()));
    }
}
