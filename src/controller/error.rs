use thiserror::Error;

use crate::datastore::DataStoreError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    DataStore(#[from] DataStoreError),
    #[error("foreground service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("wrong response from the foreground service")]
    WrongResponse,
}
