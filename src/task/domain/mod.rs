//! Domain model for task records.
//!
//! Tasks are owned by the task store and referenced everywhere else by
//! [`TaskId`]; no domain type holds a live reference to another task, so
//! parent/child and dependency relationships never form ownership cycles.

mod error;
mod ids;
mod task;

pub use error::{ParseTaskFieldError, ValidationCode, ValidationError};
pub use ids::{ActorId, Minutes, SprintId, TaskId, TaskVersion};
pub use task::{
    Completion, MAX_TITLE_LENGTH, NewTaskData, PersistedTaskData, Priority, Task, TaskChanges,
    TaskField, TaskType,
};
