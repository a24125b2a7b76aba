pub mod notifier;
mod scheduler;

pub use notifier::{CommandNotifier, LogNotifier, NotificationClick, Notifier};
pub use scheduler::NotificationScheduler;
