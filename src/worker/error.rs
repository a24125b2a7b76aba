use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("install failed on {resource}: {reason}")]
    Install { resource: String, reason: String },
    #[error("network request failed: {0}")]
    Network(String),
    #[error("cache storage error: {0}")]
    Cache(String),
    #[error("invalid url {0:?}: {1}")]
    Url(String, url::ParseError),
    #[error("unable to reach a window: {0}")]
    Window(String),
    #[error("unable to start the proxy: {0}")]
    Server(String),
}
