use std::time::Duration;

use super::error::WorkerError;
use super::message::{CachedResponse, WorkerRequest};

#[async_trait::async_trait]
pub trait Fetcher: Sync + Send + 'static {
    /// Any HTTP status is a response; only transport failures are errors.
    async fn fetch(&self, request: &WorkerRequest) -> Result<CachedResponse, WorkerError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &WorkerRequest) -> Result<CachedResponse, WorkerError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.end_to_end_headers());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        Ok(CachedResponse::from_parts(status, &headers, body.to_vec()))
    }
}
