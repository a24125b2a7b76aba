mod error;
mod file;
#[cfg(test)]
mod memory;

pub use error::StorageError;
pub use file::FileRecordStorage;
#[cfg(test)]
pub use memory::MemoryRecordStorage;

/// Durable key-value records. Each write replaces the whole value of a key.
#[async_trait::async_trait]
pub trait RecordStorage: Sync + Send + 'static {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn store(&self, key: &str, value: String) -> Result<(), StorageError>;
}
