//! Transition guard conditions.

use super::Actor;
use crate::task::domain::{Task, TaskField, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guard evaluated before a workflow transition is accepted.
///
/// The set is closed so that validation is exhaustively checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionCondition {
    /// The rendered field value equals `value`.
    FieldEquals {
        /// Field to inspect.
        field: TaskField,
        /// Expected rendered value.
        value: String,
    },
    /// The field has a value.
    FieldPresent {
        /// Field to inspect.
        field: TaskField,
    },
    /// The task carries `label`.
    HasLabel {
        /// Required label.
        label: String,
    },
    /// The acting user holds `role`.
    RoleIs {
        /// Required role.
        role: String,
    },
    /// At least `count` approvals accompany the request.
    ApprovalCountAtLeast {
        /// Minimum approvals.
        count: u32,
    },
    /// Every task this task depends on is in a done-category state.
    DependenciesResolved,
}

impl fmt::Display for TransitionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldEquals { field, value } => write!(f, "{field:?} equals '{value}'"),
            Self::FieldPresent { field } => write!(f, "{field:?} is set"),
            Self::HasLabel { label } => write!(f, "has label '{label}'"),
            Self::RoleIs { role } => write!(f, "actor has role '{role}'"),
            Self::ApprovalCountAtLeast { count } => write!(f, "at least {count} approvals"),
            Self::DependenciesResolved => write!(f, "dependencies resolved"),
        }
    }
}

/// Facts gathered by the engine against which conditions are evaluated.
#[derive(Debug, Clone, Copy)]
pub struct ConditionInput<'a> {
    /// Task being transitioned.
    pub task: &'a Task,
    /// Acting user.
    pub actor: &'a Actor,
    /// Approvals accompanying the request.
    pub approvals: u32,
    /// Predecessors that are not yet in a done-category state.
    pub unresolved_dependencies: &'a [TaskId],
}

impl TransitionCondition {
    /// Evaluates the condition.
    #[must_use]
    pub fn holds(&self, input: &ConditionInput<'_>) -> bool {
        match self {
            Self::FieldEquals { field, value } => {
                input.task.field_value(*field).as_deref() == Some(value.as_str())
            }
            Self::FieldPresent { field } => input.task.field_value(*field).is_some(),
            Self::HasLabel { label } => input.task.has_label(label),
            Self::RoleIs { role } => input.actor.has_role(role),
            Self::ApprovalCountAtLeast { count } => input.approvals >= *count,
            Self::DependenciesResolved => input.unresolved_dependencies.is_empty(),
        }
    }
}
