use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::notifier::{Alert, Notifier, Permission};
use crate::clock::Clock;
use crate::datastore::{DataStoreError, TaskDataStore};
use crate::model::{Task, TaskId};

/// Fires one alert per task when its due date passes.
///
/// A pass is synchronous apart from the single batched write at its end, and
/// the caller drives it from one thread, so two passes never overlap.
pub struct NotificationScheduler {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl NotificationScheduler {
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self {
            clock,
            notifier,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Asks for alert permission only while the platform has not decided yet.
    pub async fn request_permission(&self) -> Permission {
        match self.notifier.permission() {
            Permission::Undetermined => {
                let permission = self.notifier.request_permission().await;
                info!(?permission, "Alert permission requested.");
                permission
            }
            permission => permission,
        }
    }

    /// Runs one evaluation pass and returns how many alerts fired.
    pub async fn evaluate<D>(&self, store: &mut D) -> Result<usize, DataStoreError>
    where
        D: TaskDataStore + Send,
    {
        let now = self.clock.now();
        let mut due: Vec<TaskId> = Vec::new();
        for task in store.items().iter().filter(|task| task.is_alert_due(now)) {
            self.emit(task);
            due.push(task.id.clone());
        }

        if due.is_empty() {
            return Ok(0);
        }
        debug!(count = due.len(), "Alerts fired.");
        store.mark_notified(&due).await?;
        Ok(due.len())
    }

    fn emit(&self, task: &Task) {
        let alert = Alert::for_task(task);
        if let Err(err) = self.notifier.show(&alert) {
            info!(id = %task.id, reason = %err, "Reminder: {} ({})", alert.title, alert.body);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::datastore::{MemoryRecordStorage, TaskStore};
    use crate::model::{NewTask, TaskUpdate};
    use crate::scheduler::notifier::NotifyError;

    const KEY: &str = "taskgo_tasks_v1";

    struct RecordingNotifier {
        permission: Mutex<Permission>,
        grant_on_request: Permission,
        failing_titles: Vec<String>,
        shown: Mutex<Vec<Alert>>,
        requests: Mutex<usize>,
    }

    impl RecordingNotifier {
        fn granted() -> Self {
            Self::new(Permission::Granted, Permission::Granted)
        }

        fn new(permission: Permission, grant_on_request: Permission) -> Self {
            Self {
                permission: Mutex::new(permission),
                grant_on_request,
                failing_titles: vec![],
                shown: Mutex::new(vec![]),
                requests: Mutex::new(0),
            }
        }

        fn shown(&self) -> Vec<Alert> {
            self.shown.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        fn permission(&self) -> Permission {
            *self.permission.lock()
        }

        async fn request_permission(&self) -> Permission {
            *self.requests.lock() += 1;
            *self.permission.lock() = self.grant_on_request;
            self.grant_on_request
        }

        fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
            if self.permission() != Permission::Granted {
                return Err(NotifyError::PermissionDenied);
            }
            if self.failing_titles.contains(&alert.title) {
                return Err(NotifyError::Unavailable("boom".to_string()));
            }
            self.shown.lock().push(alert.clone());
            Ok(())
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        scheduler: NotificationScheduler,
        store: TaskStore<MemoryRecordStorage>,
    }

    fn fixture(notifier: RecordingNotifier) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        let notifier = Arc::new(notifier);
        let scheduler = NotificationScheduler::new(
            clock.clone(),
            notifier.clone(),
            Duration::from_secs(30),
        );
        let store = TaskStore::new(MemoryRecordStorage::new(), KEY, clock.clone());
        Fixture {
            clock,
            notifier,
            scheduler,
            store,
        }
    }

    fn reminder(title: &str, due_in: ChronoDuration, clock: &ManualClock) -> NewTask {
        NewTask {
            title: title.to_string(),
            due_date: Some(clock.now() + due_in),
            notify: true,
            ..NewTask::default()
        }
    }

    fn stored(store: &TaskStore<MemoryRecordStorage>) -> Vec<Task> {
        serde_json::from_str(&store.storage().record(KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_overdue_task_alerts_once() {
        // GIVEN
        let mut f = fixture(RecordingNotifier::granted());
        let task = f
            .store
            .create(reminder("Pay rent", ChronoDuration::seconds(-1), &f.clock))
            .await
            .unwrap();

        // WHEN
        let first = f.scheduler.evaluate(&mut f.store).await.unwrap();
        let second = f.scheduler.evaluate(&mut f.store).await.unwrap();

        // THEN
        assert_eq!(first, 1);
        assert_eq!(second, 0);
        let shown = f.notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].tag, task.id);
        assert_eq!(shown[0].body, "Priority: medium");
        assert!(stored(&f.store)[0].notified);
    }

    #[tokio::test]
    async fn test_due_date_crossing() {
        let mut f = fixture(RecordingNotifier::granted());
        f.store
            .create(reminder("standup", ChronoDuration::minutes(5), &f.clock))
            .await
            .unwrap();

        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 0);

        f.clock.advance(ChronoDuration::minutes(5));
        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_skips_tasks_without_alert() {
        let mut f = fixture(RecordingNotifier::granted());
        let past = ChronoDuration::hours(-1);
        f.store
            .create(NewTask {
                notify: false,
                ..reminder("muted", past, &f.clock)
            })
            .await
            .unwrap();
        f.store
            .create(NewTask {
                due_date: None,
                ..reminder("undated", past, &f.clock)
            })
            .await
            .unwrap();

        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 0);
        assert!(f.notifier.shown().is_empty());
    }

    #[tokio::test]
    async fn test_editing_due_date_rearms() {
        let mut f = fixture(RecordingNotifier::granted());
        let task = f
            .store
            .create(reminder("Pay rent", ChronoDuration::seconds(-1), &f.clock))
            .await
            .unwrap();
        f.scheduler.evaluate(&mut f.store).await.unwrap();

        // WHEN moved to a new past due date
        let update = TaskUpdate {
            due_date: Some(Some(f.clock.now() - ChronoDuration::seconds(1))),
            ..TaskUpdate::default()
        };
        f.store.update(&task.id, update).await.unwrap();

        // THEN it alerts again
        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 1);
        assert_eq!(f.notifier.shown().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_alert_does_not_stop_the_pass() {
        let mut notifier = RecordingNotifier::granted();
        notifier.failing_titles = vec!["first".to_string()];
        let mut f = fixture(notifier);
        let past = ChronoDuration::seconds(-10);
        f.store
            .create(reminder("first", past, &f.clock))
            .await
            .unwrap();
        f.store
            .create(reminder("second", past + ChronoDuration::seconds(1), &f.clock))
            .await
            .unwrap();

        let fired = f.scheduler.evaluate(&mut f.store).await.unwrap();

        assert_eq!(fired, 2, "failed alerts are logged and still marked");
        let shown: Vec<String> = f.notifier.shown().into_iter().map(|a| a.title).collect();
        assert_eq!(shown, vec!["second".to_string()]);
        assert!(stored(&f.store).iter().all(|t| t.notified));
    }

    #[tokio::test]
    async fn test_denied_permission_still_marks() {
        let mut f = fixture(RecordingNotifier::new(
            Permission::Undetermined,
            Permission::Denied,
        ));
        assert_eq!(f.scheduler.request_permission().await, Permission::Denied);
        f.store
            .create(reminder("quiet", ChronoDuration::seconds(-1), &f.clock))
            .await
            .unwrap();

        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 1);
        assert!(f.notifier.shown().is_empty());
        assert_eq!(f.scheduler.evaluate(&mut f.store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_permission_requested_only_when_undetermined() {
        let f = fixture(RecordingNotifier::new(
            Permission::Undetermined,
            Permission::Granted,
        ));
        assert_eq!(f.scheduler.request_permission().await, Permission::Granted);
        assert_eq!(f.scheduler.request_permission().await, Permission::Granted);
        assert_eq!(*f.notifier.requests.lock(), 1);

        let denied = fixture(RecordingNotifier::new(
            Permission::Denied,
            Permission::Granted,
        ));
        assert_eq!(denied.scheduler.request_permission().await, Permission::Denied);
        assert_eq!(*denied.notifier.requests.lock(), 0);
    }
}
