//! Dependency edges between tasks.

use crate::task::domain::{Minutes, ParseTaskFieldError, TaskId, ValidationCode, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling relationship between a task and the task it depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The task starts after the predecessor finishes.
    #[default]
    FinishToStart,
    /// The task starts after the predecessor starts.
    StartToStart,
    /// The task finishes after the predecessor finishes.
    FinishToFinish,
    /// The task finishes after the predecessor starts.
    StartToFinish,
}

impl DependencyType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
            Self::StartToStart => "start_to_start",
            Self::FinishToFinish => "finish_to_finish",
            Self::StartToFinish => "start_to_finish",
        }
    }
}

impl TryFrom<&str> for DependencyType {
    type Error = ParseTaskFieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "finish_to_start" => Ok(Self::FinishToStart),
            "start_to_start" => Ok(Self::StartToStart),
            "finish_to_finish" => Ok(Self::FinishToFinish),
            "start_to_finish" => Ok(Self::StartToFinish),
            _ => Err(ParseTaskFieldError {
                kind: "dependency type",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge: `task_id` depends on `depends_on_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskDependency {
    task_id: TaskId,
    depends_on_id: TaskId,
    dependency_type: DependencyType,
    lag: Minutes,
}

impl TaskDependency {
    /// Creates a dependency edge.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] with [`ValidationCode::SelfReference`]
    /// when a task would depend on itself.
    pub fn new(
        task_id: TaskId,
        depends_on_id: TaskId,
        dependency_type: DependencyType,
        lag: Minutes,
    ) -> Result<Self, ValidationError> {
        if task_id == depends_on_id {
            return Err(ValidationError::new(
                "depends_on_id",
                ValidationCode::SelfReference,
            ));
        }
        Ok(Self {
            task_id,
            depends_on_id,
            dependency_type,
            lag,
        })
    }

    /// Creates a finish-to-start edge without lag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a task would depend on itself.
    pub fn finish_to_start(task_id: TaskId, depends_on_id: TaskId) -> Result<Self, ValidationError> {
        Self::new(task_id, depends_on_id, DependencyType::FinishToStart, Minutes::ZERO)
    }

    /// Returns the dependent task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the predecessor task.
    #[must_use]
    pub const fn depends_on_id(&self) -> TaskId {
        self.depends_on_id
    }

    /// Returns the dependency type.
    #[must_use]
    pub const fn dependency_type(&self) -> DependencyType {
        self.dependency_type
    }

    /// Returns the lag (negative for lead).
    #[must_use]
    pub const fn lag(&self) -> Minutes {
        self.lag
    }

    /// Returns the `(task, predecessor)` key identifying the edge.
    #[must_use]
    pub const fn key(&self) -> (TaskId, TaskId) {
        (self.task_id, self.depends_on_id)
    }
}
