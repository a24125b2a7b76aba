use tokio::process::Command;
use tracing::debug;
use url::Url;

use super::error::WorkerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub url: Url,
}

/// The windows currently showing the application.
#[async_trait::async_trait]
pub trait WindowClients: Send + Sync {
    async fn windows(&self) -> Result<Vec<ClientWindow>, WorkerError>;
    async fn focus(&self, window: &ClientWindow) -> Result<(), WorkerError>;
    async fn open_window(&self, url: &Url) -> Result<(), WorkerError>;
}

/// Opens the application through the desktop URL handler.
///
/// The handler cannot list browser windows, so every click opens the
/// application URL and the browser decides whether to reuse a tab.
pub struct SystemOpener {
    program: String,
}

impl SystemOpener {
    pub fn new(program: Option<String>) -> Self {
        let default = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Self {
            program: program.unwrap_or_else(|| default.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl WindowClients for SystemOpener {
    async fn windows(&self) -> Result<Vec<ClientWindow>, WorkerError> {
        Ok(vec![])
    }

    async fn focus(&self, window: &ClientWindow) -> Result<(), WorkerError> {
        self.open_window(&window.url).await
    }

    async fn open_window(&self, url: &Url) -> Result<(), WorkerError> {
        debug!(program = %self.program, %url, "Opening window.");
        let status = Command::new(&self.program)
            .arg(url.as_str())
            .status()
            .await
            .map_err(|err| WorkerError::Window(format!("{}: {}", self.program, err)))?;
        if status.success() {
            Ok(())
        } else {
            Err(WorkerError::Window(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}
