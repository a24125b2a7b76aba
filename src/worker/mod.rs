mod cache;
mod clients;
mod error;
mod fetch;
mod message;
mod server;
mod worker;

pub use cache::{FileCacheStorage, MemoryCacheStorage};
pub use clients::{SystemOpener, WindowClients};
pub use fetch::HttpFetcher;
pub use server::WorkerRuntime;
pub use worker::{CacheWorker, WorkerSettings};
