mod cli;
mod clock;
mod config;
mod controller;
mod datastore;
mod log;
mod model;
mod scheduler;
mod worker;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{event, info, Level};
use tracing_subscriber::EnvFilter;
use url::Url;

use cli::{format_task, Cli, Command, Reply};
use clock::{Clock, SystemClock};
use config::{Config, NotifierConfig, WorkerConfig};
use controller::{blocking_send, ControllerRequest, ControllerRequestPublisher, TaskController};
use datastore::{FileRecordStorage, TaskStore};
use model::Task;
use scheduler::{CommandNotifier, LogNotifier, NotificationClick, NotificationScheduler, Notifier};
use worker::{
    CacheWorker, FileCacheStorage, HttpFetcher, MemoryCacheStorage, SystemOpener, WindowClients,
    WorkerRuntime, WorkerSettings,
};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let env_filter = EnvFilter::try_from_env("TASKGO_LOG");
    log::setup(env_filter, &config.log);

    event!(Level::INFO, "Starting taskgo: {}", env!("FULL_VERSION"));

    // alert clicks are only routed when the worker is there to take them
    let (tx_clicks, rx_clicks) = mpsc::unbounded_channel::<NotificationClick>();
    let serving = matches!(cli.command, Command::Serve);
    let notifier: Arc<dyn Notifier> = match &config.notifier {
        NotifierConfig::Command { program } => {
            let notifier = CommandNotifier::new(program.clone());
            if serving && config.worker.is_some() {
                Arc::new(notifier.with_clicks(tx_clicks))
            } else {
                Arc::new(notifier)
            }
        }
        NotifierConfig::Log => Arc::new(LogNotifier),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = NotificationScheduler::new(clock.clone(), notifier, config.scheduler.interval);
    let store = TaskStore::new(
        FileRecordStorage::new(&config.storage.path),
        config.storage.key.clone(),
        clock,
    );
    let (controller, publisher) = TaskController::start(store, scheduler);

    let outcome = match cli.command.into_request() {
        Some((request, reply)) => run_once(&publisher, request, reply),
        None => serve(&config, rx_clicks),
    };
    controller.stop()?;
    outcome
}

fn run_once(
    publisher: &ControllerRequestPublisher,
    request: ControllerRequest,
    reply: Reply,
) -> anyhow::Result<()> {
    match reply {
        Reply::Task => {
            let task: Task = blocking_send(publisher, request)?;
            println!("{}", format_task(&task));
        }
        Reply::List => {
            let tasks: Vec<Task> = blocking_send(publisher, request)?;
            for task in tasks.iter() {
                println!("{}", format_task(task));
            }
        }
        Reply::Count => {
            let count: usize = blocking_send(publisher, request)?;
            println!("{}", count);
        }
    }
    Ok(())
}

fn serve(config: &Config, clicks: UnboundedReceiver<NotificationClick>) -> anyhow::Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, term.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, term.clone())?;

    let worker = match &config.worker {
        Some(worker_config) => Some(start_worker(worker_config, clicks)?),
        None => None,
    };
    if let Some(worker) = &worker {
        info!("Application available at http://{}/", worker.local_addr());
    }

    while !term.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(200));
    }
    info!("Shutting down.");
    if let Some(worker) = worker {
        worker.stop();
    }
    Ok(())
}

fn start_worker(
    config: &WorkerConfig,
    clicks: UnboundedReceiver<NotificationClick>,
) -> anyhow::Result<WorkerRuntime> {
    let listen = config.listen.socket_addr()?;
    let local_url = Url::parse(&format!("http://{}/", listen))?;
    let settings = WorkerSettings::from_config(config, local_url);
    let fetcher = HttpFetcher::new(config.timeout)?;
    let clients: Arc<dyn WindowClients> = Arc::new(SystemOpener::new(config.opener.clone()));

    let runtime = match &config.cache_dir {
        Some(dir) => WorkerRuntime::start(
            CacheWorker::new(FileCacheStorage::new(dir), fetcher, settings),
            listen,
            clients,
            clicks,
        ),
        None => WorkerRuntime::start(
            CacheWorker::new(MemoryCacheStorage::new(), fetcher, settings),
            listen,
            clients,
            clicks,
        ),
    };
    runtime.context("cache worker failed to start")
}

#[cfg(all(test, feature = "e2e"))]
mod e2e_tests;
