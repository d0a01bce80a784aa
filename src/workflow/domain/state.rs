//! Workflow states and their categories.

use super::WorkflowDefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a workflow state, e.g. `in_progress`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateId(String);

impl StateId {
    /// Creates a validated state identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDefinitionError::EmptyStateId`] when the identifier
    /// is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDefinitionError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDefinitionError::EmptyStateId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Creates an identifier from a known-valid literal.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_owned())
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StateId {
    type Error = WorkflowDefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StateId> for String {
    fn from(value: StateId) -> Self {
        value.0
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse category every workflow state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    /// Work is accepted but not started.
    Todo,
    /// Work is under way.
    InProgress,
    /// Work is finished (completed or cancelled). Terminal.
    Done,
}

impl StateCategory {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Returns whether states of this category admit no outgoing transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A state in a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// State identifier stored on tasks.
    pub id: StateId,
    /// Display name.
    pub name: String,
    /// Category used by metrics and terminal-state enforcement.
    pub category: StateCategory,
    /// Whether tasks in this state count as blocked for sprint risk.
    #[serde(default)]
    pub blocked: bool,
}

impl WorkflowState {
    /// Creates a non-blocking state.
    #[must_use]
    pub fn new(id: StateId, name: impl Into<String>, category: StateCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            blocked: false,
        }
    }

    /// Marks the state as blocking.
    #[must_use]
    pub const fn blocking(mut self) -> Self {
        self.blocked = true;
        self
    }

    /// Returns whether the state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.category.is_terminal()
    }
}
