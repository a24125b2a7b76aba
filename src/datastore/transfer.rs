//! Bulk serialization boundary on top of a [`TaskDataStore`].
//!
//! Export writes the whole collection as a pretty-printed JSON array. Import
//! validates a whole document first and only then replaces the collection, so
//! a rejected document never causes a partial mutation.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::{DataStoreError, TaskDataStore};
use crate::model::{task::validate_title, Priority, Task, TaskId};

/// A task-shaped record as found in an import document. Only `title` is
/// required; the identity and creation stamp are generated when missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    id: Option<TaskId>,
    title: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    notify: bool,
    #[serde(default)]
    notified: bool,
}

pub fn export<D: TaskDataStore>(store: &D) -> Result<String, DataStoreError> {
    let tasks = store.items();
    serde_json::to_string_pretty(&tasks)
        .map_err(|err| DataStoreError::Persistence(err.into()))
}

pub async fn import<D>(store: &mut D, document: &str) -> Result<usize, DataStoreError>
where
    D: TaskDataStore + Send,
{
    let tasks = parse_document(document, store.now())?;
    store.replace_all(tasks).await
}

pub async fn export_to_path<D, P>(store: &D, path: P) -> Result<usize, DataStoreError>
where
    D: TaskDataStore + Sync,
    P: AsRef<Path>,
{
    let document = export(store)?;
    let path = path.as_ref();
    tokio::fs::write(path, document)
        .await
        .map_err(|err| DataStoreError::Persistence(super::StorageError::Write(path.to_owned(), err)))?;
    let count = store.items().len();
    info!(path = %path.display(), count, "Tasks exported.");
    Ok(count)
}

pub async fn import_from_path<D, P>(store: &mut D, path: P) -> Result<usize, DataStoreError>
where
    D: TaskDataStore + Send,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let document = tokio::fs::read_to_string(path).await.map_err(|err| {
        DataStoreError::Validation(format!("cannot read {}: {}", path.display(), err))
    })?;
    import(store, &document).await
}

/// Parses an import document into tasks, generating whatever identity fields
/// are missing. Fails on the first malformed record.
pub fn parse_document(document: &str, now: DateTime<Utc>) -> Result<Vec<Task>, DataStoreError> {
    let records: Vec<TaskRecord> = serde_json::from_str(document).map_err(|err| {
        DataStoreError::Validation(format!("not a list of tasks: {}", err))
    })?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let title = validate_title(&record.title)
            .map_err(|err| DataStoreError::Validation(format!("record {}: {}", idx, err)))?;
        let id = record
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().hyphenated().to_string());
        if !seen.insert(id.clone()) {
            return Err(DataStoreError::Validation(format!(
                "record {}: duplicate id {}",
                idx, id
            )));
        }
        tasks.push(Task {
            id,
            title,
            created_at: record.created_at.unwrap_or(now),
            due_date: record.due_date,
            priority: record.priority,
            category: record
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            completed: record.completed,
            notify: record.notify,
            notified: record.notified,
        });
    }
    Ok(tasks)
}
