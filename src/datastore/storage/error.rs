use std::path::PathBuf;
use thiserror::*;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unable to read record {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("unable to write record {0:?}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("unable to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}
