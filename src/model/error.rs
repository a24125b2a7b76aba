use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("the task needs a title")]
    EmptyTitle,
    #[error("unknown priority: {0:?}")]
    UnknownPriority(String),
}
