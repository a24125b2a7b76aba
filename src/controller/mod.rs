mod error;
mod service;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::instrument;

pub use error::ControllerError;
pub use service::{blocking_send, ControllerRequest, RequestResponse};

use crate::config::CHANNEL_SIZE;
use crate::datastore::TaskDataStore;
use crate::scheduler::NotificationScheduler;

use self::service::ForegroundService;

pub type ControllerRequestPublisher = mpsc::Sender<RequestResponse>;

/// Runs the foreground domain: the task store and the alert scheduler behind
/// a request channel, on a runtime of its own.
pub struct TaskController {
    _foreground_runtime: Runtime,
}

impl TaskController {
    #[instrument(skip(datastore, scheduler))]
    pub fn start<D>(datastore: D, scheduler: NotificationScheduler) -> (Self, ControllerRequestPublisher)
    where
        D: TaskDataStore + std::marker::Send + 'static + std::marker::Sync,
    {
        let (tx_controller_request, rx_controller_request) =
            mpsc::channel::<RequestResponse>(CHANNEL_SIZE);
        let foreground_service =
            ForegroundService::new(datastore, scheduler, rx_controller_request);

        let controller = Self {
            _foreground_runtime: foreground_service.build_runtime(),
        };
        (controller, tx_controller_request)
    }

    pub fn stop(self) -> Result<(), ControllerError> {
        self._foreground_runtime
            .shutdown_timeout(std::time::Duration::from_millis(100));
        Ok(())
    }
}
