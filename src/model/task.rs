use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::ModelError;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "baja")]
    Low,
    #[serde(alias = "media")]
    Medium,
    #[serde(alias = "alta")]
    High,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baja" => Ok(Priority::Low),
            "medium" | "media" => Ok(Priority::Medium),
            "high" | "alta" => Ok(Priority::High),
            other => Err(ModelError::UnknownPriority(other.to_string())),
        }
    }
}

/// A single to-do item, exactly as it is kept in the durable record and in
/// exported documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "deserialize_category")]
    pub category: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub notified: bool,
}

/// Fields accepted when a task is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: Option<String>,
    pub notify: bool,
}

/// Field changes applied by an update. `None` leaves a field untouched; the
/// nested options of `due_date` and `category` distinguish "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub notify: Option<bool>,
}

impl TaskUpdate {
    pub fn rearms_alert(&self) -> bool {
        self.due_date.is_some() || self.notify.is_some()
    }
}

impl Task {
    pub fn new(new_task: NewTask, now: DateTime<Utc>) -> Result<Task, ModelError> {
        let title = validate_title(&new_task.title)?;

        Ok(Self {
            id: Uuid::new_v4().hyphenated().to_string(),
            title,
            created_at: now,
            due_date: new_task.due_date,
            priority: new_task.priority,
            category: new_task.category.and_then(normalize_category),
            completed: false,
            notify: new_task.notify,
            notified: false,
        })
    }

    /// Applies `update` in place. Nothing changes when validation fails.
    pub fn apply(&mut self, update: TaskUpdate) -> Result<(), ModelError> {
        let title = match &update.title {
            Some(title) => Some(validate_title(title)?),
            None => None,
        };
        let rearm = update.rearms_alert();

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(category) = update.category {
            self.category = category.and_then(normalize_category);
        }
        if let Some(notify) = update.notify {
            self.notify = notify;
        }
        if rearm {
            self.notified = false;
        }
        Ok(())
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
    }

    pub fn is_alert_due(&self, now: DateTime<Utc>) -> bool {
        self.notify
            && !self.notified
            && self.due_date.map(|due| due <= now).unwrap_or(false)
    }

    pub fn alert_body(&self) -> String {
        match &self.category {
            Some(category) => format!("{} · Priority: {}", category, self.priority),
            None => format!("Priority: {}", self.priority),
        }
    }
}

/// Incomplete before completed, then earliest due date first, dated before
/// undated. Everything else compares equal so a stable sort keeps stored order.
pub fn display_order(a: &Task, b: &Task) -> Ordering {
    match (a.completed, b.completed) {
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        _ => (),
    }
    match (a.due_date, b.due_date) {
        (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn validate_title(title: &str) -> Result<String, ModelError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ModelError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_category(category: String) -> Option<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn deserialize_category<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let category: Option<String> = Option::deserialize(deserializer)?;
    Ok(category.and_then(normalize_category))
}
