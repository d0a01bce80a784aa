//! Post-transition automation actions.

use super::StateId;
use crate::task::domain::{ActorId, TaskField, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action dispatched after a transition commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostAction {
    /// Assign the task to an actor.
    Assign {
        /// New assignee.
        assignee: ActorId,
    },
    /// Notify actors about the transition.
    Notify {
        /// Actors to notify.
        recipients: Vec<ActorId>,
        /// Message body.
        message: String,
    },
    /// Create a subtask under the transitioned task.
    CreateSubtask {
        /// Subtask title.
        title: String,
    },
    /// Set a task field.
    UpdateField {
        /// Field to set.
        field: TaskField,
        /// New rendered value.
        value: String,
    },
    /// Call an external webhook.
    Webhook {
        /// Target URL.
        url: String,
    },
}

impl PostAction {
    /// Returns the action kind for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Notify { .. } => "notify",
            Self::CreateSubtask { .. } => "create_subtask",
            Self::UpdateField { .. } => "update_field",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// Facts about the committed transition passed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    /// Transitioned task.
    pub task_id: TaskId,
    /// Status before the transition.
    pub from_status: StateId,
    /// Status after the transition.
    pub to_status: StateId,
    /// Acting user.
    pub actor_id: ActorId,
    /// Commit timestamp.
    pub transitioned_at: DateTime<Utc>,
}
