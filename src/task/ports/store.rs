//! Store port for tasks, dependency edges and the transition log.

use crate::graph::domain::{CircularDependencyError, TaskDependency};
use crate::task::domain::{ActorId, SprintId, Task, TaskId, TaskVersion};
use crate::workflow::domain::StateTransition;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Durable storage for tasks, their dependency edges and transition log.
///
/// Implementations provide per-row optimistic concurrency: every task row
/// carries a [`TaskVersion`] that writes must match and then advance.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Stores a new task together with its creation transition record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier exists.
    async fn create(&self, task: &Task, initial: &StateTransition) -> TaskStoreResult<()>;

    /// Replaces a task row if its stored version equals `expected`.
    ///
    /// Returns the stored task carrying the advanced version.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Conflict`] on version mismatch and
    /// [`TaskStoreError::NotFound`] when the row does not exist.
    async fn update_with_version(&self, task: &Task, expected: TaskVersion) -> TaskStoreResult<Task>;

    /// Replaces a task row and appends `record` in one atomic unit.
    ///
    /// Neither write is visible unless both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Conflict`] on version mismatch and
    /// [`TaskStoreError::NotFound`] when the row does not exist.
    async fn commit_transition(
        &self,
        task: &Task,
        expected: TaskVersion,
        record: &StateTransition,
    ) -> TaskStoreResult<Task>;

    /// Appends a transition record to the log.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn append_transition(&self, record: &StateTransition) -> TaskStoreResult<()>;

    /// Returns the transition log of a task in append order.
    async fn transitions(&self, task_id: TaskId) -> TaskStoreResult<Vec<StateTransition>>;

    /// Returns the tasks matching `query`, ordered by creation time.
    async fn list_tasks(&self, query: &TaskQuery) -> TaskStoreResult<Vec<Task>>;

    /// Returns the edges in which `task_id` is either endpoint.
    async fn list_edges(&self, task_id: TaskId) -> TaskStoreResult<Vec<TaskDependency>>;

    /// Returns every dependency edge.
    async fn all_edges(&self) -> TaskStoreResult<Vec<TaskDependency>>;

    /// Inserts a dependency edge.
    ///
    /// Acyclicity validation against the current edge set and the insert
    /// happen within one serializable boundary, so concurrent inserts cannot
    /// jointly create a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::CircularDependency`] when the edge would
    /// close a cycle and [`TaskStoreError::NotFound`] when either task is
    /// missing.
    async fn insert_dependency(&self, dependency: &TaskDependency) -> TaskStoreResult<()>;

    /// Removes a dependency edge, returning whether it existed.
    async fn remove_dependency(&self, task_id: TaskId, depends_on_id: TaskId)
    -> TaskStoreResult<bool>;

    /// Hard-deletes a task and its transition log.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Referenced`] while another task depends on
    /// it and [`TaskStoreError::NotFound`] when it does not exist.
    async fn delete(&self, id: TaskId) -> TaskStoreResult<()>;
}

/// Filter for [`TaskStore::list_tasks`]. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Restrict to these identifiers.
    pub ids: Option<BTreeSet<TaskId>>,
    /// Restrict to one sprint.
    pub sprint_id: Option<SprintId>,
    /// Restrict to children of one task.
    pub parent_id: Option<TaskId>,
    /// Restrict to tasks assigned to one of these actors.
    pub assignees: Option<BTreeSet<ActorId>>,
}

impl TaskQuery {
    /// Matches every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the given identifiers.
    #[must_use]
    pub fn by_ids(ids: impl IntoIterator<Item = TaskId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Matches tasks in `sprint_id`.
    #[must_use]
    pub fn in_sprint(sprint_id: SprintId) -> Self {
        Self {
            sprint_id: Some(sprint_id),
            ..Self::default()
        }
    }

    /// Matches direct children of `parent_id`.
    #[must_use]
    pub fn children_of(parent_id: TaskId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    /// Matches tasks assigned to one of `assignees`.
    #[must_use]
    pub fn assigned_to(assignees: impl IntoIterator<Item = ActorId>) -> Self {
        Self {
            assignees: Some(assignees.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Returns whether `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.ids.as_ref().is_none_or(|ids| ids.contains(&task.id()))
            && self
                .sprint_id
                .is_none_or(|sprint| task.sprint_id() == Some(sprint))
            && self
                .parent_id
                .is_none_or(|parent| task.parent_id() == Some(parent))
            && self.assignees.as_ref().is_none_or(|assignees| {
                task.assignee()
                    .is_some_and(|assignee| assignees.contains(assignee))
            })
    }
}

/// Kind of entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A task.
    Task,
    /// A sprint.
    Sprint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => f.write_str("task"),
            Self::Sprint => f.write_str("sprint"),
        }
    }
}

/// The requested entity does not exist.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Kind of entity.
    pub entity: EntityKind,
    /// Identifier looked up.
    pub id: String,
}

impl NotFoundError {
    /// Builds the error for a missing task.
    #[must_use]
    pub fn task(id: TaskId) -> Self {
        Self {
            entity: EntityKind::Task,
            id: id.to_string(),
        }
    }

    /// Builds the error for a missing sprint.
    #[must_use]
    pub fn sprint(id: SprintId) -> Self {
        Self {
            entity: EntityKind::Sprint,
            id: id.to_string(),
        }
    }
}

/// A check-and-set write lost against a concurrent writer.
///
/// The caller may re-read the task and retry once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("task {task_id} version conflict: expected {expected_version}, found {actual_version}")]
pub struct ConflictError {
    /// Task whose row was written.
    pub task_id: TaskId,
    /// Version the writer read.
    pub expected_version: TaskVersion,
    /// Version currently stored.
    pub actual_version: TaskVersion,
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The entity was not found.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Optimistic concurrency check failed.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// The task is still referenced by dependency edges.
    #[error("task {task_id} is referenced by {} dependent task(s)", .dependents.len())]
    Referenced {
        /// Task that could not be deleted.
        task_id: TaskId,
        /// Tasks depending on it.
        dependents: Vec<TaskId>,
    },

    /// The dependency edge would close a cycle.
    #[error(transparent)]
    CircularDependency(#[from] CircularDependencyError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
