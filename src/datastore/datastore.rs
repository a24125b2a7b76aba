use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{error::DataStoreError, RecordStorage};
use crate::clock::Clock;
use crate::model::{display_order, NewTask, Task, TaskId, TaskUpdate};

/// The canonical task collection. Every mutation is written through to the
/// durable record before it returns. When that write fails the in-memory
/// collection keeps the attempted state and `Persistence` is returned.
#[async_trait::async_trait]
pub trait TaskDataStore {
    async fn create(&mut self, new_task: NewTask) -> Result<Task, DataStoreError>;
    async fn update(&mut self, id: &str, update: TaskUpdate) -> Result<Task, DataStoreError>;
    async fn toggle_completed(&mut self, id: &str) -> Result<Task, DataStoreError>;
    async fn remove(&mut self, id: &str) -> Result<Task, DataStoreError>;
    async fn clear_completed(&mut self) -> Result<usize, DataStoreError>;
    async fn replace_all(&mut self, tasks: Vec<Task>) -> Result<usize, DataStoreError>;
    async fn mark_notified(&mut self, ids: &[TaskId]) -> Result<usize, DataStoreError>;
    fn items(&self) -> Vec<Task>;
    fn get(&self, id: &str) -> Result<Task, DataStoreError>;
    /// Current time on the clock that stamps this store's tasks.
    fn now(&self) -> DateTime<Utc>;
    async fn load_tasks(&mut self);
}

pub struct TaskStore<S: RecordStorage> {
    tasks: Vec<Task>,
    storage: S,
    key: String,
    clock: Arc<dyn Clock>,
}

impl<S> TaskStore<S>
where
    S: RecordStorage,
{
    pub fn new(storage: S, key: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Vec::new(),
            storage,
            key: key.into(),
            clock,
        }
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn persist(&self) -> Result<(), DataStoreError> {
        let record = serde_json::to_string(&self.tasks).map_err(super::StorageError::from)?;
        if let Err(err) = self.storage.store(&self.key, record).await {
            error!(key = %self.key, reason = %err, "Failed to persistently store the tasks.");
            return Err(DataStoreError::Persistence(err));
        }
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, DataStoreError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| DataStoreError::NotFound(id.to_string()))
    }
}

#[async_trait::async_trait]
impl<S> TaskDataStore for TaskStore<S>
where
    S: RecordStorage,
{
    async fn create(&mut self, new_task: NewTask) -> Result<Task, DataStoreError> {
        let task = Task::new(new_task, self.clock.now())?;
        self.tasks.push(task.clone());
        self.persist().await?;
        info!(id = %task.id, "Task created.");
        Ok(task)
    }

    async fn update(&mut self, id: &str, update: TaskUpdate) -> Result<Task, DataStoreError> {
        let idx = self.position(id)?;
        self.tasks[idx].apply(update)?;
        let task = self.tasks[idx].clone();
        self.persist().await?;
        Ok(task)
    }

    async fn toggle_completed(&mut self, id: &str) -> Result<Task, DataStoreError> {
        let idx = self.position(id)?;
        self.tasks[idx].toggle_completed();
        let task = self.tasks[idx].clone();
        self.persist().await?;
        Ok(task)
    }

    async fn remove(&mut self, id: &str) -> Result<Task, DataStoreError> {
        let idx = self.position(id)?;
        let task = self.tasks.remove(idx);
        self.persist().await?;
        Ok(task)
    }

    async fn clear_completed(&mut self) -> Result<usize, DataStoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();
        self.persist().await?;
        Ok(removed)
    }

    async fn replace_all(&mut self, tasks: Vec<Task>) -> Result<usize, DataStoreError> {
        self.tasks = tasks;
        self.persist().await?;
        info!(count = self.tasks.len(), "Task collection replaced.");
        Ok(self.tasks.len())
    }

    async fn mark_notified(&mut self, ids: &[TaskId]) -> Result<usize, DataStoreError> {
        let mut marked = 0;
        for task in self.tasks.iter_mut() {
            if !task.notified && ids.contains(&task.id) {
                task.notified = true;
                marked += 1;
            }
        }
        if marked > 0 {
            self.persist().await?;
        }
        Ok(marked)
    }

    fn items(&self) -> Vec<Task> {
        let mut list = self.tasks.clone();
        list.sort_by(display_order);
        list
    }

    fn get(&self, id: &str) -> Result<Task, DataStoreError> {
        match self.tasks.iter().find(|task| task.id == id) {
            Some(task) => Ok(task.clone()),
            None => Err(DataStoreError::NotFound(id.to_string())),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_tasks(&mut self) {
        info!(key = %self.key, "Loading tasks from storage...");
        self.tasks = match self.storage.fetch(&self.key).await {
            Ok(Some(record)) => match serde_json::from_str::<Vec<Task>>(&record) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(reason = %err, "Stored tasks are corrupt, starting empty.");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(reason = %err, "Unable to read stored tasks, starting empty.");
                Vec::new()
            }
        };
        info!("Loaded tasks: {}", self.tasks.len());
    }
}
