//! Immutable state transition records and the acting user.

use super::StateId;
use crate::task::domain::{ActorId, ParseTaskFieldError, TaskId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// What caused a transition record to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// Initial status assigned at task creation.
    Creation,
    /// A user requested the transition.
    Manual,
    /// An automation rule requested the transition.
    Automation,
}

impl TransitionTrigger {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Manual => "manual",
            Self::Automation => "automation",
        }
    }
}

impl TryFrom<&str> for TransitionTrigger {
    type Error = ParseTaskFieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "creation" => Ok(Self::Creation),
            "manual" => Ok(Self::Manual),
            "automation" => Ok(Self::Automation),
            _ => Err(ParseTaskFieldError {
                kind: "transition trigger",
                value: value.to_owned(),
            }),
        }
    }
}

/// Append-only record of one accepted status change.
///
/// Records are never mutated or deleted; the ordered log of a task is the
/// authoritative source of its status history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    task_id: TaskId,
    from_status: Option<StateId>,
    to_status: StateId,
    actor_id: ActorId,
    transitioned_at: DateTime<Utc>,
    triggered_by: TransitionTrigger,
    duration_in_state: Option<TimeDelta>,
}

impl StateTransition {
    /// Creates the record written when a task is created.
    #[must_use]
    pub const fn creation(
        task_id: TaskId,
        status: StateId,
        actor_id: ActorId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            from_status: None,
            to_status: status,
            actor_id,
            transitioned_at: at,
            triggered_by: TransitionTrigger::Creation,
            duration_in_state: None,
        }
    }

    /// Creates the record for a status change.
    #[must_use]
    pub const fn change(
        task_id: TaskId,
        from_status: StateId,
        to_status: StateId,
        actor_id: ActorId,
        at: DateTime<Utc>,
        triggered_by: TransitionTrigger,
        duration_in_state: Option<TimeDelta>,
    ) -> Self {
        Self {
            task_id,
            from_status: Some(from_status),
            to_status,
            actor_id,
            transitioned_at: at,
            triggered_by,
            duration_in_state,
        }
    }

    /// Returns the task the record belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the status left, or `None` for the creation record.
    #[must_use]
    pub const fn from_status(&self) -> Option<&StateId> {
        self.from_status.as_ref()
    }

    /// Returns the status entered.
    #[must_use]
    pub const fn to_status(&self) -> &StateId {
        &self.to_status
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Returns when the transition happened.
    #[must_use]
    pub const fn transitioned_at(&self) -> DateTime<Utc> {
        self.transitioned_at
    }

    /// Returns what caused the transition.
    #[must_use]
    pub const fn triggered_by(&self) -> TransitionTrigger {
        self.triggered_by
    }

    /// Returns how long the task had been in the status it left.
    #[must_use]
    pub const fn duration_in_state(&self) -> Option<TimeDelta> {
        self.duration_in_state
    }
}

/// User or automation performing a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    id: ActorId,
    roles: Vec<String>,
}

impl Actor {
    /// Creates an actor without roles.
    #[must_use]
    pub const fn new(id: ActorId) -> Self {
        Self {
            id,
            roles: Vec::new(),
        }
    }

    /// Adds roles to the actor.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Returns the actor identifier.
    #[must_use]
    pub const fn id(&self) -> &ActorId {
        &self.id
    }

    /// Returns the actor's roles.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns whether the actor holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}
