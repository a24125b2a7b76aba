use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::controller::ControllerError;
use crate::datastore::{transfer, DataStoreError, TaskDataStore};
use crate::model::{NewTask, Task, TaskId, TaskUpdate};
use crate::scheduler::NotificationScheduler;

#[derive(Debug)]
pub enum ControllerRequest {
    Create(NewTask),
    Update(TaskId, TaskUpdate),
    ToggleCompleted(TaskId),
    Remove(TaskId),
    ClearCompleted,
    List,
    Get(TaskId),
    Export(PathBuf),
    Import(PathBuf),
}

impl ControllerRequest {
    fn is_mutation(&self) -> bool {
        !matches!(
            self,
            ControllerRequest::List | ControllerRequest::Get(_) | ControllerRequest::Export(_)
        )
    }
}

#[derive(Debug)]
pub enum ControllerResponse {
    Task(Task),
    List(Vec<Task>),
    Count(usize),
    Error(DataStoreError),
}

impl TryFrom<ControllerResponse> for Task {
    type Error = ControllerError;

    fn try_from(value: ControllerResponse) -> Result<Self, Self::Error> {
        match value {
            ControllerResponse::Task(task) => Ok(task),
            ControllerResponse::Error(err) => Err(ControllerError::DataStore(err)),
            _ => Err(ControllerError::WrongResponse),
        }
    }
}

impl TryFrom<ControllerResponse> for Vec<Task> {
    type Error = ControllerError;

    fn try_from(value: ControllerResponse) -> Result<Self, Self::Error> {
        match value {
            ControllerResponse::List(tasks) => Ok(tasks),
            ControllerResponse::Error(err) => Err(ControllerError::DataStore(err)),
            _ => Err(ControllerError::WrongResponse),
        }
    }
}

impl TryFrom<ControllerResponse> for usize {
    type Error = ControllerError;

    fn try_from(value: ControllerResponse) -> Result<Self, Self::Error> {
        match value {
            ControllerResponse::Count(count) => Ok(count),
            ControllerResponse::Error(err) => Err(ControllerError::DataStore(err)),
            _ => Err(ControllerError::WrongResponse),
        }
    }
}

pub type RequestResponse = (ControllerRequest, oneshot::Sender<ControllerResponse>);

/// Owns the task store and the alert scheduler. Requests, mutation-triggered
/// alert passes and interval ticks all run on this one task, one at a time.
pub struct ForegroundService<D: TaskDataStore> {
    store: D,
    scheduler: NotificationScheduler,
    rx: Receiver<RequestResponse>,
}

impl<D: TaskDataStore + Send + Sync + 'static> ForegroundService<D> {
    pub fn new(store: D, scheduler: NotificationScheduler, rx: Receiver<RequestResponse>) -> Self {
        Self {
            store,
            scheduler,
            rx,
        }
    }

    pub fn build_runtime(self) -> Runtime {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("foreground")
            .enable_all()
            .build()
            .expect("[foreground] failed to create runtime");

        runtime.handle().spawn(self.start());
        runtime
    }

    pub async fn start(mut self) {
        self.store.load_tasks().await;
        self.scheduler.request_permission().await;
        self.evaluate("startup").await;

        let mut ticker = time::interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately and the startup pass already ran
        ticker.tick().await;

        info!("Starting foreground loop.");
        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some((request, response_sender)) => {
                        let mutation = request.is_mutation();
                        let response = self.handle_request(request).await;
                        if mutation {
                            self.evaluate("mutation").await;
                        }
                        let _ = response_sender.send(response);
                    }
                    None => break,
                },
                _ = ticker.tick() => self.evaluate("interval").await,
            }
        }
        info!("Finishing foreground loop.");
    }

    async fn handle_request(&mut self, request: ControllerRequest) -> ControllerResponse {
        let response = match request {
            ControllerRequest::Create(new_task) => {
                self.store.create(new_task).await.map(ControllerResponse::Task)
            }
            ControllerRequest::Update(id, update) => self
                .store
                .update(&id, update)
                .await
                .map(ControllerResponse::Task),
            ControllerRequest::ToggleCompleted(id) => self
                .store
                .toggle_completed(&id)
                .await
                .map(ControllerResponse::Task),
            ControllerRequest::Remove(id) => {
                self.store.remove(&id).await.map(ControllerResponse::Task)
            }
            ControllerRequest::ClearCompleted => self
                .store
                .clear_completed()
                .await
                .map(ControllerResponse::Count),
            ControllerRequest::List => Ok(ControllerResponse::List(self.store.items())),
            ControllerRequest::Get(id) => self.store.get(&id).map(ControllerResponse::Task),
            ControllerRequest::Export(path) => transfer::export_to_path(&self.store, path)
                .await
                .map(ControllerResponse::Count),
            ControllerRequest::Import(path) => transfer::import_from_path(&mut self.store, path)
                .await
                .map(ControllerResponse::Count),
        };

        match response {
            Ok(response) => response,
            Err(err) => {
                error!(reason = %err, "Unable to execute controller request.");
                ControllerResponse::Error(err)
            }
        }
    }

    async fn evaluate(&mut self, reason: &str) {
        match self.scheduler.evaluate(&mut self.store).await {
            Ok(0) => (),
            Ok(fired) => debug!(reason, fired, "Alert pass finished."),
            Err(err) => error!(reason = %err, "Alert pass could not persist notified tasks."),
        }
    }
}

#[cfg(test)]
pub async fn send<T>(tx: &Sender<RequestResponse>, request: ControllerRequest) -> Result<T, ControllerError>
where
    T: TryFrom<ControllerResponse, Error = ControllerError>,
{
    let (req_sender, callback) = oneshot::channel();
    tx.send((request, req_sender))
        .await
        .map_err(|err| ControllerError::ServiceUnavailable(err.to_string()))?;

    let res = callback
        .await
        .map_err(|err| ControllerError::ServiceUnavailable(err.to_string()))?;
    T::try_from(res)
}

/// Sends a request from outside of any runtime and waits for the reply.
pub fn blocking_send<T>(
    tx: &Sender<RequestResponse>,
    request: ControllerRequest,
) -> Result<T, ControllerError>
where
    T: TryFrom<ControllerResponse, Error = ControllerError>,
{
    let (req_sender, callback) = oneshot::channel();
    tx.blocking_send((request, req_sender))
        .map_err(|err| ControllerError::ServiceUnavailable(err.to_string()))?;

    let res = callback
        .blocking_recv()
        .map_err(|err| ControllerError::ServiceUnavailable(err.to_string()))?;
    T::try_from(res)
}
