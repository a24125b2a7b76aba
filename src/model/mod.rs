pub mod error;
pub mod task;

pub use error::ModelError;
pub use task::{display_order, NewTask, Priority, Task, TaskId, TaskUpdate};
