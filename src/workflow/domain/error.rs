//! Error types for workflow definition and transition validation.

use super::{StateId, TransitionCondition};
use crate::task::domain::{ActorId, TaskId};
use std::fmt;
use thiserror::Error;

/// Errors returned while building a workflow definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDefinitionError {
    /// A state identifier is empty after trimming.
    #[error("workflow state identifier must not be empty")]
    EmptyStateId,

    /// The workflow name is empty after trimming.
    #[error("workflow name must not be empty")]
    EmptyName,

    /// Two states share an identifier.
    #[error("duplicate workflow state: {0}")]
    DuplicateState(StateId),

    /// A transition or marker references an undeclared state.
    #[error("workflow references unknown state: {0}")]
    UnknownState(StateId),

    /// The same transition is declared twice.
    #[error("duplicate workflow transition: {from} -> {to}")]
    DuplicateTransition {
        /// Source state.
        from: StateId,
        /// Target state.
        to: StateId,
    },

    /// A transition leaves a terminal state.
    #[error("terminal state {0} must not have outgoing transitions")]
    TransitionFromTerminal(StateId),

    /// The initial state is terminal.
    #[error("initial state {0} must not be terminal")]
    TerminalInitialState(StateId),

    /// The cancel state is not terminal.
    #[error("cancel state {0} must be terminal")]
    NonTerminalCancelState(StateId),
}

/// One reason a requested transition was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionViolation {
    /// The task's current status is not a state of the workflow.
    UnknownCurrentState(StateId),
    /// The target status is not a state of the workflow.
    UnknownTargetState(StateId),
    /// The current status is terminal.
    TerminalState(StateId),
    /// The workflow has no transition between the two states.
    NoSuchTransition {
        /// Current status.
        from: StateId,
        /// Requested status.
        to: StateId,
    },
    /// The actor is neither in the allowed roles nor the allowed users.
    ActorNotAllowed(ActorId),
    /// Fewer approvals than the transition requires.
    InsufficientApprovals {
        /// Approvals required by the transition.
        required: u32,
        /// Approvals supplied.
        actual: u32,
    },
    /// A guard condition evaluated false.
    ConditionFailed(TransitionCondition),
}

impl fmt::Display for ConditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCurrentState(state) => write!(f, "unknown current state {state}"),
            Self::UnknownTargetState(state) => write!(f, "unknown target state {state}"),
            Self::TerminalState(state) => write!(f, "state {state} is terminal"),
            Self::NoSuchTransition { from, to } => write!(f, "no transition {from} -> {to}"),
            Self::ActorNotAllowed(actor) => write!(f, "actor {actor} is not allowed"),
            Self::InsufficientApprovals { required, actual } => {
                write!(f, "{actual} of {required} required approvals")
            }
            Self::ConditionFailed(condition) => write!(f, "condition failed: {condition}"),
        }
    }
}

/// A transition request that failed workflow validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "transition of task {task_id} from {from} to {to} rejected: {}",
    join_violations(.violated_conditions)
)]
pub struct WorkflowValidationError {
    /// Task the request targeted.
    pub task_id: TaskId,
    /// Status at validation time.
    pub from: StateId,
    /// Requested status.
    pub to: StateId,
    /// Every violated rule, in evaluation order.
    pub violated_conditions: Vec<ConditionViolation>,
}

impl WorkflowValidationError {
    /// Returns whether `violation` is among the violated conditions.
    #[must_use]
    pub fn contains(&self, violation: &ConditionViolation) -> bool {
        self.violated_conditions.contains(violation)
    }
}

fn join_violations(violations: &[ConditionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
