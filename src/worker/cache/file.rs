use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{upsert, CacheEntry, CacheStorage};
use crate::worker::error::WorkerError;
use crate::worker::message::{CachedResponse, RequestKey};

/// One `<dir>/<namespace>.json` file per namespace, replaced through a temp
/// file so a namespace is either fully written or untouched.
pub struct FileCacheStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCacheStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            write_lock: Mutex::new(()),
        }
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }

    async fn read_entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, WorkerError> {
        let path = self.namespace_path(namespace);
        match fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| WorkerError::Cache(format!("{}: {}", path.display(), err))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(err) => Err(WorkerError::Cache(format!("{}: {}", path.display(), err))),
        }
    }

    async fn write_entries(&self, namespace: &str, entries: &[CacheEntry]) -> Result<(), WorkerError> {
        let cache_err = |path: &Path, err: std::io::Error| {
            WorkerError::Cache(format!("{}: {}", path.display(), err))
        };
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| cache_err(&self.dir, err))?;

        let contents = serde_json::to_string(entries)
            .map_err(|err| WorkerError::Cache(err.to_string()))?;
        let tmp_path = self.dir.join(format!(".{}.json.tmp", namespace));
        let path = self.namespace_path(namespace);
        fs::write(&tmp_path, contents)
            .await
            .map_err(|err| cache_err(&tmp_path, err))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|err| cache_err(&path, err))
    }
}

#[async_trait::async_trait]
impl CacheStorage for FileCacheStorage {
    async fn namespaces(&self) -> Result<Vec<String>, WorkerError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(WorkerError::Cache(err.to_string())),
        };

        let mut names = vec![];
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| WorkerError::Cache(err.to_string()))?
        {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(".json") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn lookup(
        &self,
        namespace: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, WorkerError> {
        Ok(self
            .read_entries(namespace)
            .await?
            .into_iter()
            .find(|e| &e.key == key)
            .map(|e| e.response))
    }

    async fn put(&self, namespace: &str, entry: CacheEntry) -> Result<(), WorkerError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries(namespace).await?;
        upsert(&mut entries, entry);
        self.write_entries(namespace, &entries).await
    }

    async fn replace(&self, namespace: &str, entries: Vec<CacheEntry>) -> Result<(), WorkerError> {
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            upsert(&mut stored, entry);
        }
        let _guard = self.write_lock.lock().await;
        self.write_entries(namespace, &stored).await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, WorkerError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.namespace_path(namespace)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(WorkerError::Cache(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, body: &[u8]) -> CacheEntry {
        CacheEntry {
            key: RequestKey {
                method: "GET".to_string(),
                url: format!("http://localhost:8080{}", path),
            },
            response: CachedResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "text/css".to_string())],
                body: body.to_vec(),
            },
        }
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheStorage::new(dir.path());
        cache
            .replace(
                "taskgo-cache-v1",
                vec![entry("/style.css", b"body{}"), entry("/", &[0xff, 0x00])],
            )
            .await
            .unwrap();

        let reopened = FileCacheStorage::new(dir.path());
        let found = reopened
            .lookup("taskgo-cache-v1", &entry("/", b"").key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body, vec![0xff, 0x00]);
        assert_eq!(reopened.namespaces().await.unwrap(), vec!["taskgo-cache-v1"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheStorage::new(dir.path().join("cache"));

        assert!(cache.namespaces().await.unwrap().is_empty());
        assert!(cache
            .lookup("taskgo-cache-v1", &entry("/", b"").key)
            .await
            .unwrap()
            .is_none());
        assert!(!cache.delete("taskgo-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_overwrites_corrupt_namespace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("taskgo-cache-v1.json"), "{\"not\": \"entries\"}").unwrap();
        let cache = FileCacheStorage::new(dir.path());
        assert!(cache
            .lookup("taskgo-cache-v1", &entry("/", b"").key)
            .await
            .is_err());

        cache
            .replace("taskgo-cache-v1", vec![entry("/", b"<shell>")])
            .await
            .unwrap();

        let found = cache
            .lookup("taskgo-cache-v1", &entry("/", b"").key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body, b"<shell>");
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheStorage::new(dir.path());
        cache.put("taskgo-cache-v1", entry("/", b"old")).await.unwrap();
        cache.put("taskgo-cache-v2", entry("/", b"new")).await.unwrap();

        assert!(cache.delete("taskgo-cache-v1").await.unwrap());
        assert_eq!(cache.namespaces().await.unwrap(), vec!["taskgo-cache-v2"]);
    }
}
