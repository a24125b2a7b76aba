use serde::Deserialize;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

#[derive(Deserialize)]
#[serde(tag = "type")]
pub enum LogType {
    Stdout,
    Stderr,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: String,
    #[serde(default)]
    pub structured: bool,
    pub backend: LogType,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
            backend: LogType::Stderr,
        }
    }
}

/// setup log from an optional environment filter and the config file
///
/// if the environment filter is present, then the configured level is not used
pub fn setup(
    env_filter: Result<EnvFilter, tracing_subscriber::filter::FromEnvError>,
    config: &Option<Log>,
) {
    let default_config = Log::default();
    let config = config.as_ref().unwrap_or(&default_config);
    let env_filter = match env_filter {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let sbuilder = Subscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc3339())
        .with_level(true)
        .with_env_filter(env_filter);

    let result = match (&config.backend, config.structured) {
        (LogType::Stdout, false) => {
            tracing::subscriber::set_global_default(sbuilder.with_ansi(true).finish())
        }
        (LogType::Stdout, true) => tracing::subscriber::set_global_default(sbuilder.json().finish()),
        (LogType::Stderr, false) => tracing::subscriber::set_global_default(
            sbuilder
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish(),
        ),
        (LogType::Stderr, true) => tracing::subscriber::set_global_default(
            sbuilder.with_writer(std::io::stderr).json().finish(),
        ),
    };
    result.expect("setting tracing default subscriber failed");
}
