use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::net::SocketAddr;
use std::time::Duration;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::*;
use url::Url;

pub const CHANNEL_SIZE: usize = 32;

pub const DEFAULT_CONFIG: &str = r#"
log:
    level: info
    structured: false
    backend:
        type: Stderr
storage:
    path: ./taskgo-data
scheduler:
    interval: 30s
notifier:
    type: Command
    program: notify-send
worker:
    listen:
        port: 8085
    origin: http://127.0.0.1:8080/
    cache_dir: ./taskgo-data/cache
"#;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error {0} when reading config")]
    IoError(#[from] std::io::Error),
    #[error("cannot open config file '{0}' : {1}")]
    OpeningError(PathBuf, std::io::Error),
    #[error("UTF8 format error when reading config")]
    Utf8Error,
    #[error("format error {0} when reading config")]
    FormatError(#[from] serde_yaml::Error),
    #[error("invalid listen address: {0}")]
    ListenAddress(String),
}

#[derive(Clone, Deserialize)]
pub struct Listen {
    pub host: Option<String>,
    pub port: u16,
}

impl Listen {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.as_deref().unwrap_or("127.0.0.1");
        format!("{}:{}", host, self.port)
            .parse()
            .map_err(|_| ConfigError::ListenAddress(format!("{}:{}", host, self.port)))
    }
}

#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    #[serde(default = "default_record_key")]
    pub key: String,
}

#[derive(Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(
        default = "default_scheduler_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: default_scheduler_interval(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type")]
pub enum NotifierConfig {
    Command { program: String },
    Log,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Log
    }
}

#[derive(Clone, Deserialize)]
pub struct WorkerConfig {
    pub listen: Listen,
    pub origin: Url,
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
    #[serde(default = "default_cache_version")]
    pub version: String,
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
    #[serde(default = "default_shell_root")]
    pub shell_root: String,
    #[serde(
        default = "default_worker_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
    pub app_url: Option<Url>,
    pub opener: Option<String>,
}

#[derive(Deserialize)]
pub struct Config {
    pub log: Option<crate::log::Log>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    pub worker: Option<WorkerConfig>,
}

impl Config {
    pub fn from_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let mut file = File::open(p).map_err(|e| ConfigError::OpeningError(p.to_owned(), e))?;
        let mut contents = vec![];
        file.read_to_end(&mut contents)?;
        let contents = String::from_utf8(contents).map_err(|_| ConfigError::Utf8Error)?;
        let config = Config::from_str(&contents)?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::from_str(DEFAULT_CONFIG)?),
        }
    }
}

fn default_record_key() -> String {
    "taskgo_tasks_v1".to_string()
}

fn default_scheduler_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_prefix() -> String {
    "taskgo-cache".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/style.css", "/app.js", "/manifest.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_shell_root() -> String {
    "/".to_string()
}

fn default_worker_timeout() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
