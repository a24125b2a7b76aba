use chrono::{Duration as ChronoDuration, Utc};
use httpmock::Method::GET;
use httpmock::MockServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::controller::{blocking_send, ControllerRequest, TaskController};
use crate::datastore::{FileRecordStorage, TaskStore};
use crate::model::{NewTask, Task};
use crate::scheduler::{LogNotifier, NotificationScheduler};
use crate::worker::{
    CacheWorker, FileCacheStorage, HttpFetcher, SystemOpener, WorkerRuntime, WorkerSettings,
};

fn start_controller(dir: &std::path::Path) -> (TaskController, crate::controller::ControllerRequestPublisher) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = NotificationScheduler::new(
        clock.clone(),
        Arc::new(LogNotifier),
        Duration::from_millis(100),
    );
    let store = TaskStore::new(FileRecordStorage::new(dir), "taskgo_tasks_v1", clock);
    TaskController::start(store, scheduler)
}

#[test]
fn test_e2e_tasks_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (controller, tx) = start_controller(dir.path());
    let created: Task = blocking_send(
        &tx,
        ControllerRequest::Create(NewTask {
            title: "Pay rent".to_string(),
            due_date: Some(Utc::now() - ChronoDuration::seconds(1)),
            notify: true,
            ..NewTask::default()
        }),
    )
    .unwrap();
    controller.stop().unwrap();

    let (controller, tx) = start_controller(dir.path());
    let tasks: Vec<Task> = blocking_send(&tx, ControllerRequest::List).unwrap();
    controller.stop().unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, created.id);
    assert!(tasks[0].notified, "the pass after creation marked it");
}

#[test]
fn test_e2e_new_version_replaces_cache() {
    let origin = MockServer::start();
    origin.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("<shell>");
    });
    let cache_dir = tempfile::tempdir().unwrap();

    for version in ["v1", "v2"] {
        let settings = WorkerSettings {
            origin: Url::parse(&origin.base_url()).unwrap(),
            cache_prefix: "taskgo-cache".to_string(),
            version: version.to_string(),
            manifest: vec!["/".to_string()],
            shell_root: "/".to_string(),
            app_url: Url::parse("http://127.0.0.1:8085/").unwrap(),
        };
        let worker = CacheWorker::new(
            FileCacheStorage::new(cache_dir.path()),
            HttpFetcher::new(Duration::from_secs(2)).unwrap(),
            settings,
        );
        let (_tx, rx) = mpsc::unbounded_channel();
        let runtime = WorkerRuntime::start(
            worker,
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(SystemOpener::new(Some("true".to_string()))),
            rx,
        )
        .unwrap();
        runtime.stop();
    }

    let mut files: Vec<String> = std::fs::read_dir(cache_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files, vec!["taskgo-cache-v2.json"]);
}
