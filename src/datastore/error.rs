use thiserror::*;

use super::storage::StorageError;
use crate::model::{ModelError, TaskId};

#[derive(Debug, Error)]
pub enum DataStoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("unable to persist tasks: {0}")]
    Persistence(#[from] StorageError),
}

impl From<ModelError> for DataStoreError {
    fn from(err: ModelError) -> Self {
        DataStoreError::Validation(err.to_string())
    }
}
