mod datastore;
mod error;
mod storage;
pub mod transfer;

pub use datastore::TaskDataStore;
pub use datastore::TaskStore;
pub use error::DataStoreError;
pub use storage::FileRecordStorage;
#[cfg(test)]
pub use storage::MemoryRecordStorage;
pub use storage::{RecordStorage, StorageError};
