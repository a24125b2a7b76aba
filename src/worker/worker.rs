use http::Method;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::{CacheEntry, CacheStorage};
use super::clients::WindowClients;
use super::error::WorkerError;
use super::fetch::Fetcher;
use super::message::{CachedResponse, ResponseSource, Served, WorkerRequest};
use crate::config::WorkerConfig;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub origin: Url,
    pub cache_prefix: String,
    pub version: String,
    pub manifest: Vec<String>,
    pub shell_root: String,
    pub app_url: Url,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig, local_url: Url) -> Self {
        Self {
            origin: config.origin.clone(),
            cache_prefix: config.cache_prefix.clone(),
            version: config.version.clone(),
            manifest: config.manifest.clone(),
            shell_root: config.shell_root.clone(),
            app_url: config.app_url.clone().unwrap_or(local_url),
        }
    }

    /// `<prefix>-<version>`, the only namespace this worker reads or writes.
    pub fn namespace(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    pub fn resolve(&self, path: &str) -> Result<Url, WorkerError> {
        self.origin
            .join(path)
            .map_err(|err| WorkerError::Url(path.to_string(), err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(String),
    Opened,
}

/// Cache-first proxy logic for the application shell.
pub struct CacheWorker<C, F> {
    cache: C,
    fetcher: F,
    settings: WorkerSettings,
}

impl<C, F> CacheWorker<C, F>
where
    C: CacheStorage,
    F: Fetcher,
{
    pub fn new(cache: C, fetcher: F, settings: WorkerSettings) -> Self {
        Self {
            cache,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Fetches the whole manifest and makes it the content of the current
    /// namespace in one write. Nothing is stored unless every resource
    /// answered with a success status.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        let mut entries = Vec::with_capacity(self.settings.manifest.len());
        for resource in self.settings.manifest.iter() {
            let install_err = |reason: String| WorkerError::Install {
                resource: resource.clone(),
                reason,
            };
            let request = WorkerRequest::get(self.settings.resolve(resource)?);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|err| install_err(err.to_string()))?;
            if !response.is_success() {
                return Err(install_err(format!("status {}", response.status)));
            }
            entries.push(CacheEntry {
                key: request.key(),
                response,
            });
        }

        let count = entries.len();
        self.cache.replace(&self.settings.namespace(), entries).await?;
        info!(namespace = %self.settings.namespace(), count, "Application shell cached.");
        Ok(count)
    }

    /// Deletes namespaces left by other versions of this worker.
    pub async fn activate(&self) -> Result<usize, WorkerError> {
        let current = self.settings.namespace();
        let prefix = format!("{}-", self.settings.cache_prefix);
        let mut purged = 0;
        for namespace in self.cache.namespaces().await? {
            if namespace != current && namespace.starts_with(&prefix) {
                self.cache.delete(&namespace).await?;
                debug!(%namespace, "Stale cache purged.");
                purged += 1;
            }
        }
        Ok(purged)
    }

    pub async fn handle(&self, request: WorkerRequest) -> Served {
        let namespace = self.settings.namespace();
        let key = request.key();

        match self.cache.lookup(&namespace, &key).await {
            Ok(Some(response)) => {
                return Served {
                    response,
                    source: ResponseSource::Cache,
                }
            }
            Ok(None) => {}
            Err(err) => warn!(%key, error = %err, "Cache lookup failed."),
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if request.method == Method::GET && response.status == 200 {
                    let entry = CacheEntry {
                        key,
                        response: response.clone(),
                    };
                    if let Err(err) = self.cache.put(&namespace, entry).await {
                        warn!(url = %request.url, error = %err, "Unable to cache response.");
                    }
                }
                Served {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(err) => {
                debug!(%key, error = %err, "Network failed, serving the shell.");
                self.shell_fallback(&namespace).await
            }
        }
    }

    async fn shell_fallback(&self, namespace: &str) -> Served {
        let shell = match self.settings.resolve(&self.settings.shell_root) {
            Ok(url) => self
                .cache
                .lookup(namespace, &WorkerRequest::get(url).key())
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "Shell lookup failed.");
                    None
                }),
            Err(err) => {
                warn!(error = %err, "Invalid shell root.");
                None
            }
        };
        match shell {
            Some(response) => Served {
                response,
                source: ResponseSource::ShellFallback,
            },
            None => Served {
                response: CachedResponse::unavailable(),
                source: ResponseSource::Unavailable,
            },
        }
    }

    /// Brings an application window forward, opening one if none is shown.
    pub async fn notification_click(
        &self,
        clients: &dyn WindowClients,
    ) -> Result<ClickOutcome, WorkerError> {
        let windows = clients.windows().await?;
        match windows.iter().find(|window| self.is_app_root(&window.url)) {
            Some(window) => {
                clients.focus(window).await?;
                Ok(ClickOutcome::Focused(window.id.clone()))
            }
            None => {
                clients.open_window(&self.settings.app_url).await?;
                Ok(ClickOutcome::Opened)
            }
        }
    }

    /// True for the application root, either as opened or through the origin.
    fn is_app_root(&self, url: &Url) -> bool {
        if url == &self.settings.app_url {
            return true;
        }
        match self.settings.resolve(&self.settings.shell_root) {
            Ok(root) => url == &root,
            Err(_) => false,
        }
    }
}
