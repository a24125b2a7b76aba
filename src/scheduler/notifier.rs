use parking_lot::Mutex;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::model::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Undetermined,
    Granted,
    Denied,
}

/// What the alert surface shows. `tag` is the task id so the surface can
/// collapse repeated alerts for the same task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub tag: TaskId,
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn for_task(task: &Task) -> Self {
        Self {
            tag: task.id.clone(),
            title: task.title.clone(),
            body: task.alert_body(),
        }
    }
}

/// The user activated a displayed alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub tag: TaskId,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("permission to show alerts was not granted")]
    PermissionDenied,
    #[error("alert surface unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;
    async fn request_permission(&self) -> Permission;
    fn show(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Used when no alert surface is configured; every alert ends up as a log line.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    fn show(&self, _alert: &Alert) -> Result<(), NotifyError> {
        Err(NotifyError::PermissionDenied)
    }
}

/// Shows desktop notifications by spawning a `notify-send` compatible program.
///
/// The program is probed once when permission is requested; a missing program
/// denies permission for the rest of the process. Spawned notifications are
/// never awaited by the caller. When a click channel is attached, the
/// notification offers a default action and a click is forwarded on it.
pub struct CommandNotifier {
    program: String,
    permission: Mutex<Permission>,
    clicks: Option<UnboundedSender<NotificationClick>>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            permission: Mutex::new(Permission::Undetermined),
            clicks: None,
        }
    }

    pub fn with_clicks(mut self, clicks: UnboundedSender<NotificationClick>) -> Self {
        self.clicks = Some(clicks);
        self
    }

    fn arguments(&self, alert: &Alert) -> Vec<String> {
        let mut args = vec![
            "--app-name=taskgo".to_string(),
            format!("--hint=string:x-dunst-stack-tag:{}", alert.tag),
        ];
        if self.clicks.is_some() {
            args.push("--action=default=Open".to_string());
            args.push("--wait".to_string());
        }
        args.push(alert.title.clone());
        args.push(alert.body.clone());
        args
    }
}

#[async_trait::async_trait]
impl Notifier for CommandNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> Permission {
        let current = self.permission();
        if current != Permission::Undetermined {
            return current;
        }
        let probed = match Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) if status.success() => Permission::Granted,
            Ok(status) => {
                info!(program = %self.program, %status, "Desktop notifications unavailable.");
                Permission::Denied
            }
            Err(err) => {
                info!(program = %self.program, reason = %err, "Desktop notifications unavailable.");
                Permission::Denied
            }
        };
        *self.permission.lock() = probed;
        probed
    }

    fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
        if self.permission() != Permission::Granted {
            return Err(NotifyError::PermissionDenied);
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| NotifyError::Unavailable(err.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(self.arguments(alert))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| NotifyError::Unavailable(err.to_string()))?;

        let clicks = self.clicks.clone();
        let tag = alert.tag.clone();
        handle.spawn(async move {
            let mut output = String::new();
            if let Some(mut stdout) = child.stdout.take() {
                let _ = stdout.read_to_string(&mut output).await;
            }
            if let Err(err) = child.wait().await {
                warn!(tag = %tag, reason = %err, "Notification program did not finish.");
                return;
            }
            if output.trim() == "default" {
                if let Some(clicks) = clicks {
                    debug!(tag = %tag, "Notification activated.");
                    let _ = clicks.send(NotificationClick { tag });
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::{NewTask, Priority};

    fn alert() -> Alert {
        let task = Task::new(
            NewTask {
                title: "Pay rent".to_string(),
                priority: Priority::High,
                category: Some("home".to_string()),
                ..NewTask::default()
            },
            Utc::now(),
        )
        .unwrap();
        Alert::for_task(&task)
    }

    #[test]
    fn test_alert_for_task() {
        let alert = alert();
        assert_eq!(alert.title, "Pay rent");
        assert_eq!(alert.body, "home · Priority: high");
        assert!(!alert.tag.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_denies_permission() {
        let notifier = CommandNotifier::new("taskgo-no-such-notifier-program");
        assert_eq!(notifier.permission(), Permission::Undetermined);

        assert_eq!(notifier.request_permission().await, Permission::Denied);
        assert_eq!(notifier.request_permission().await, Permission::Denied);
        assert!(matches!(
            notifier.show(&alert()),
            Err(NotifyError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_failing_probe_denies_permission() {
        // `false --version` runs but exits with a failure status
        let failing = CommandNotifier::new("false");
        assert_eq!(failing.request_permission().await, Permission::Denied);
        assert_eq!(failing.permission(), Permission::Denied);

        let working = CommandNotifier::new("true");
        assert_eq!(working.request_permission().await, Permission::Granted);
    }

    #[tokio::test]
    async fn test_click_is_forwarded() {
        // GIVEN `echo` standing in for a notification program whose default action was taken
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = CommandNotifier::new("echo").with_clicks(tx);
        assert_eq!(notifier.request_permission().await, Permission::Granted);

        // WHEN
        notifier.show(&alert()).unwrap();

        // THEN echo prints its arguments, which is not the bare action key
        let res = tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await;
        assert!(res.is_err(), "no click without the default action");
    }

    #[test]
    fn test_arguments() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let alert = alert();

        let plain = CommandNotifier::new("notify-send").arguments(&alert);
        assert_eq!(plain.len(), 4);
        assert_eq!(plain[2], "Pay rent");

        let clickable = CommandNotifier::new("notify-send")
            .with_clicks(tx)
            .arguments(&alert);
        assert!(clickable.contains(&"--wait".to_string()));
        assert_eq!(clickable.last().unwrap(), "home · Priority: high");
    }

    #[tokio::test]
    async fn test_log_notifier() {
        assert_eq!(LogNotifier.request_permission().await, Permission::Denied);
        assert!(LogNotifier.show(&alert()).is_err());
    }
}
