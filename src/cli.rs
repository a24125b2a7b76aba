use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::controller::ControllerRequest;
use crate::model::{NewTask, Priority, Task, TaskId, TaskUpdate};

/// Tasks with due-date reminders and an offline application shell
#[derive(Parser, Debug)]
#[command(name = "taskgo", version = env!("FULL_VERSION"), long_about = None)]
pub struct Cli {
    /// YAML configuration file (built-in defaults when absent)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the alert scheduler and the offline proxy until interrupted
    Serve,

    /// Create a task
    Add {
        title: String,

        /// Due date, RFC 3339 (2024-05-01T09:00:00Z)
        #[arg(long)]
        due: Option<DateTime<Utc>>,

        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,

        #[arg(long)]
        category: Option<String>,

        /// Alert when the due date passes
        #[arg(long)]
        notify: bool,
    },

    /// Change fields of a task
    Edit {
        id: TaskId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        #[arg(long)]
        clear_due: bool,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,

        #[arg(long)]
        clear_category: bool,

        #[arg(long)]
        notify: Option<bool>,
    },

    /// Flip the completed flag of a task
    Toggle { id: TaskId },

    /// Delete a task
    Rm { id: TaskId },

    /// Delete every completed task
    ClearCompleted,

    /// Show all tasks in display order
    List,

    /// Show one task
    Show { id: TaskId },

    /// Write every task to a JSON file
    Export { file: PathBuf },

    /// Replace every task with the content of a JSON file
    Import { file: PathBuf },
}

/// What a one-shot command expects back from the foreground service.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Task,
    List,
    Count,
}

impl Command {
    /// `None` for `serve`, which is not a single request.
    pub fn into_request(self) -> Option<(ControllerRequest, Reply)> {
        let request = match self {
            Command::Serve => return None,
            Command::Add {
                title,
                due,
                priority,
                category,
                notify,
            } => (
                ControllerRequest::Create(NewTask {
                    title,
                    due_date: due,
                    priority,
                    category,
                    notify,
                }),
                Reply::Task,
            ),
            Command::Edit {
                id,
                title,
                due,
                clear_due,
                priority,
                category,
                clear_category,
                notify,
            } => {
                let update = TaskUpdate {
                    title,
                    due_date: if clear_due { Some(None) } else { due.map(Some) },
                    priority,
                    category: if clear_category {
                        Some(None)
                    } else {
                        category.map(Some)
                    },
                    notify,
                };
                (ControllerRequest::Update(id, update), Reply::Task)
            }
            Command::Toggle { id } => (ControllerRequest::ToggleCompleted(id), Reply::Task),
            Command::Rm { id } => (ControllerRequest::Remove(id), Reply::Task),
            Command::ClearCompleted => (ControllerRequest::ClearCompleted, Reply::Count),
            Command::List => (ControllerRequest::List, Reply::List),
            Command::Show { id } => (ControllerRequest::Get(id), Reply::Task),
            Command::Export { file } => (ControllerRequest::Export(file), Reply::Count),
            Command::Import { file } => (ControllerRequest::Import(file), Reply::Count),
        };
        Some(request)
    }
}

pub fn format_task(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  {} ({})",
        if task.completed { "x" } else { " " },
        task.id,
        task.title,
        task.priority.label()
    );
    if let Some(category) = &task.category {
        line.push_str(&format!(" #{}", category));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.to_rfc3339()));
        if task.notify {
            line.push_str(if task.notified { " (alerted)" } else { " (alert)" });
        }
    }
    line
}
