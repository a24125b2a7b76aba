use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn, Instrument};

use super::cache::CacheStorage;
use super::clients::WindowClients;
use super::error::WorkerError;
use super::fetch::Fetcher;
use super::message::{CachedResponse, WorkerRequest};
use super::worker::CacheWorker;
use crate::scheduler::NotificationClick;

/// The background domain: the cache worker behind a local HTTP proxy, on a
/// runtime of its own.
pub struct WorkerRuntime {
    _runtime: Runtime,
    local_addr: SocketAddr,
}

impl WorkerRuntime {
    /// Installs and activates the worker before the proxy accepts any request.
    pub fn start<C, F>(
        worker: CacheWorker<C, F>,
        listen: SocketAddr,
        clients: Arc<dyn WindowClients>,
        clicks: UnboundedReceiver<NotificationClick>,
    ) -> Result<Self, WorkerError>
    where
        C: CacheStorage,
        F: Fetcher,
    {
        let runtime = Builder::new_multi_thread()
            .thread_name("cache-worker")
            .enable_all()
            .build()
            .expect("[cache-worker] failed to create runtime");
        let worker = Arc::new(worker);

        let server = runtime.block_on(async {
            worker.install().await?;
            let purged = worker.activate().await?;
            info!(namespace = %worker.settings().namespace(), purged, "Cache worker activated.");

            let service_worker = worker.clone();
            let make_service = make_service_fn(move |_: &AddrStream| {
                let worker = service_worker.clone();
                async move {
                    Ok::<_, Infallible>(service_fn(move |request| proxy(worker.clone(), request)))
                }
            });
            let server = Server::try_bind(&listen)
                .map_err(|err| WorkerError::Server(format!("{}: {}", listen, err)))?
                .serve(make_service);
            Ok::<_, WorkerError>(server)
        })?;

        let local_addr = server.local_addr();
        runtime.spawn(
            async move {
                if let Err(err) = server.await {
                    error!(error = %err, "Proxy stopped.");
                }
            }
            .instrument(tracing::info_span!("proxy", %local_addr)),
        );
        runtime.spawn(handle_clicks(worker, clients, clicks));
        info!(%local_addr, "Proxy listening.");

        Ok(Self {
            _runtime: runtime,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(self) {
        self._runtime
            .shutdown_timeout(std::time::Duration::from_millis(100));
    }
}

async fn proxy<C, F>(
    worker: Arc<CacheWorker<C, F>>,
    request: Request<Body>,
) -> Result<Response<Body>, Infallible>
where
    C: CacheStorage,
    F: Fetcher,
{
    let (parts, body) = request.into_parts();
    let body = match hyper::body::to_bytes(body).await {
        Ok(body) => body.to_vec(),
        Err(err) => {
            warn!(error = %err, "Unreadable request body.");
            return Ok(plain(StatusCode::BAD_REQUEST, "unreadable request body"));
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = match worker.settings().resolve(target) {
        Ok(url) if url.origin() == worker.settings().origin.origin() => url,
        _ => return Ok(plain(StatusCode::BAD_REQUEST, "request outside the application")),
    };

    let served = worker
        .handle(WorkerRequest {
            method: parts.method,
            url,
            headers: parts.headers,
            body,
        })
        .await;
    debug!(%target, source = ?served.source, status = served.response.status, "Request served.");
    Ok(into_response(served.response))
}

fn into_response(cached: CachedResponse) -> Response<Body> {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers.iter() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|err| {
            warn!(error = %err, "Cached response cannot be replayed.");
            plain(StatusCode::BAD_GATEWAY, "invalid cached response")
        })
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

async fn handle_clicks<C, F>(
    worker: Arc<CacheWorker<C, F>>,
    clients: Arc<dyn WindowClients>,
    mut clicks: UnboundedReceiver<NotificationClick>,
) where
    C: CacheStorage,
    F: Fetcher,
{
    while let Some(click) = clicks.recv().await {
        match worker.notification_click(clients.as_ref()).await {
            Ok(outcome) => info!(tag = %click.tag, ?outcome, "Alert clicked."),
            Err(err) => warn!(tag = %click.tag, error = %err, "Unable to show the application."),
        }
    }
}
