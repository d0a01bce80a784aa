//! Diesel row models for task persistence.

use super::schema::{state_transitions, task_dependencies, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Task row, used for reads, inserts and version-checked updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Task type.
    pub task_type: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Workflow state identifier.
    pub status: String,
    /// Priority.
    pub priority: String,
    /// Parent task identifier.
    pub parent_id: Option<uuid::Uuid>,
    /// Story-point estimate.
    pub estimate: Option<i32>,
    /// Time estimate in minutes.
    pub time_estimate_minutes: Option<i64>,
    /// Logged time in minutes.
    pub actual_time_minutes: Option<i64>,
    /// Assignee identifier.
    pub assignee: Option<String>,
    /// Label set.
    pub labels: Value,
    /// Sprint identifier.
    pub sprint_id: Option<uuid::Uuid>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Cycle time in seconds.
    pub cycle_time_seconds: Option<i64>,
    /// Lead time in seconds.
    pub lead_time_seconds: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Row version.
    pub version: i64,
}

/// Dependency edge row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_dependencies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DependencyRow {
    /// Dependent task.
    pub task_id: uuid::Uuid,
    /// Predecessor task.
    pub depends_on_id: uuid::Uuid,
    /// Dependency type.
    pub dependency_type: String,
    /// Lag in minutes.
    pub lag_minutes: i64,
}

/// Query result row for transition records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = state_transitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransitionRow {
    /// Append sequence.
    pub id: i64,
    /// Task the record belongs to.
    pub task_id: uuid::Uuid,
    /// Previous status.
    pub from_status: Option<String>,
    /// New status.
    pub to_status: String,
    /// Acting user.
    pub actor_id: String,
    /// Transition timestamp.
    pub transitioned_at: DateTime<Utc>,
    /// Trigger kind.
    pub triggered_by: String,
    /// Seconds spent in the previous status.
    pub duration_in_state_seconds: Option<i64>,
}

/// Insert model for transition records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = state_transitions)]
pub struct NewTransitionRow {
    /// Task the record belongs to.
    pub task_id: uuid::Uuid,
    /// Previous status.
    pub from_status: Option<String>,
    /// New status.
    pub to_status: String,
    /// Acting user.
    pub actor_id: String,
    /// Transition timestamp.
    pub transitioned_at: DateTime<Utc>,
    /// Trigger kind.
    pub triggered_by: String,
    /// Seconds spent in the previous status.
    pub duration_in_state_seconds: Option<i64>,
}
