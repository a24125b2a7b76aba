use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::StorageError;
use super::RecordStorage;

/// Keeps every record as `<dir>/<key>.json`. Writes go to a sibling temp file
/// that is renamed over the record, so a record is never half written.
pub struct FileRecordStorage {
    dir: PathBuf,
}

impl FileRecordStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl RecordStorage for FileRecordStorage {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Read(path, err)),
        }
    }

    async fn store(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.record_path(key);
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| StorageError::Write(self.dir.clone(), err))?;

        let tmp_path = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp_path, value)
            .await
            .map_err(|err| StorageError::Write(tmp_path.clone(), err))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|err| StorageError::Write(path, err))
    }
}
