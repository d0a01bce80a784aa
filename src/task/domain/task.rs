//! Task aggregate root and related task lifecycle types.

use super::{
    ActorId, Minutes, ParseTaskFieldError, SprintId, TaskId, TaskVersion, ValidationCode,
    ValidationError,
};
use crate::workflow::domain::StateId;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Maximum title length accepted for a task.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Kind of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Large body of work split into stories.
    Epic,
    /// User-facing increment.
    Story,
    /// General unit of work.
    Task,
    /// Defect to be fixed.
    Bug,
    /// Child unit of another task.
    Subtask,
}

impl TaskType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Subtask => "subtask",
        }
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskFieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "epic" => Ok(Self::Epic),
            "story" => Ok(Self::Story),
            "task" => Ok(Self::Task),
            "bug" => Ok(Self::Bug),
            "subtask" => Ok(Self::Subtask),
            _ => Err(ParseTaskFieldError {
                kind: "task type",
                value: value.to_owned(),
            }),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal priority.
    #[default]
    Medium,
    /// Should be picked up soon.
    High,
    /// Must be picked up immediately.
    Critical,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParseTaskFieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskFieldError {
                kind: "priority",
                value: value.to_owned(),
            }),
        }
    }
}

/// Task fields addressable by workflow conditions and automation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    /// Task title.
    Title,
    /// Task description.
    Description,
    /// Task type.
    TaskType,
    /// Task priority.
    Priority,
    /// Assigned actor.
    Assignee,
    /// Story-point estimate.
    Estimate,
    /// Time estimate.
    TimeEstimate,
    /// Sprint membership.
    Sprint,
    /// Parent task.
    Parent,
}

/// Data required to create a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskData {
    /// Kind of work item.
    pub task_type: TaskType,
    /// Title, validated on construction.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Initial workflow status.
    pub status: StateId,
    /// Priority.
    pub priority: Priority,
    /// Parent task, if any.
    pub parent_id: Option<TaskId>,
    /// Story-point estimate.
    pub estimate: Option<u32>,
    /// Time estimate.
    pub time_estimate: Option<Minutes>,
    /// Assigned actor.
    pub assignee: Option<ActorId>,
    /// Labels.
    pub labels: Vec<String>,
    /// Sprint membership.
    pub sprint_id: Option<SprintId>,
}

/// Elapsed-time figures recorded when a task reaches a done-category state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
    /// First todo-category entry to completion.
    pub cycle_time: TimeDelta,
    /// Creation to completion.
    pub lead_time: TimeDelta,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    task_type: TaskType,
    title: String,
    description: Option<String>,
    status: StateId,
    priority: Priority,
    parent_id: Option<TaskId>,
    estimate: Option<u32>,
    time_estimate: Option<Minutes>,
    actual_time: Option<Minutes>,
    assignee: Option<ActorId>,
    labels: Vec<String>,
    sprint_id: Option<SprintId>,
    completion: Option<Completion>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: TaskVersion,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted task type.
    pub task_type: TaskType,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: Option<String>,
    /// Persisted workflow status.
    pub status: StateId,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted parent reference.
    pub parent_id: Option<TaskId>,
    /// Persisted story-point estimate.
    pub estimate: Option<u32>,
    /// Persisted time estimate.
    pub time_estimate: Option<Minutes>,
    /// Persisted actual time.
    pub actual_time: Option<Minutes>,
    /// Persisted assignee.
    pub assignee: Option<ActorId>,
    /// Persisted labels.
    pub labels: Vec<String>,
    /// Persisted sprint membership.
    pub sprint_id: Option<SprintId>,
    /// Persisted completion figures.
    pub completion: Option<Completion>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted row version.
    pub version: TaskVersion,
}

impl Task {
    /// Creates a new task at [`TaskVersion::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the title is empty or too long.
    pub fn new(data: NewTaskData, clock: &impl Clock) -> Result<Self, ValidationError> {
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            task_type: data.task_type,
            title: validate_title(data.title)?,
            description: data.description,
            status: data.status,
            priority: data.priority,
            parent_id: data.parent_id,
            estimate: data.estimate,
            time_estimate: data.time_estimate,
            actual_time: None,
            assignee: data.assignee,
            labels: normalize_labels(data.labels),
            sprint_id: data.sprint_id,
            completion: None,
            created_at: timestamp,
            updated_at: timestamp,
            version: TaskVersion::INITIAL,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            task_type: data.task_type,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            parent_id: data.parent_id,
            estimate: data.estimate,
            time_estimate: data.time_estimate,
            actual_time: data.actual_time,
            assignee: data.assignee,
            labels: data.labels,
            sprint_id: data.sprint_id,
            completion: data.completion,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the current workflow status.
    #[must_use]
    pub const fn status(&self) -> &StateId {
        &self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the parent task, if any.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskId> {
        self.parent_id
    }

    /// Returns the story-point estimate.
    #[must_use]
    pub const fn estimate(&self) -> Option<u32> {
        self.estimate
    }

    /// Returns the time estimate.
    #[must_use]
    pub const fn time_estimate(&self) -> Option<Minutes> {
        self.time_estimate
    }

    /// Returns the recorded actual time.
    #[must_use]
    pub const fn actual_time(&self) -> Option<Minutes> {
        self.actual_time
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&ActorId> {
        self.assignee.as_ref()
    }

    /// Returns the labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns whether the task carries `label`.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|existing| existing == label)
    }

    /// Returns the sprint the task belongs to, if any.
    #[must_use]
    pub const fn sprint_id(&self) -> Option<SprintId> {
        self.sprint_id
    }

    /// Returns completion figures once the task reached a done state.
    #[must_use]
    pub const fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    /// Returns the completion timestamp, if completed.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completion.map(|completion| completion.completed_at)
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the row version this snapshot was read at.
    #[must_use]
    pub const fn version(&self) -> TaskVersion {
        self.version
    }

    /// Returns the value of `field` rendered as text, or `None` when unset.
    #[must_use]
    pub fn field_value(&self, field: TaskField) -> Option<String> {
        match field {
            TaskField::Title => Some(self.title.clone()),
            TaskField::Description => self.description.clone(),
            TaskField::TaskType => Some(self.task_type.as_str().to_owned()),
            TaskField::Priority => Some(self.priority.as_str().to_owned()),
            TaskField::Assignee => self.assignee.as_ref().map(ToString::to_string),
            TaskField::Estimate => self.estimate.map(|points| points.to_string()),
            TaskField::TimeEstimate => self.time_estimate.map(|minutes| minutes.value().to_string()),
            TaskField::Sprint => self.sprint_id.map(|sprint| sprint.to_string()),
            TaskField::Parent => self.parent_id.map(|parent| parent.to_string()),
        }
    }

    /// Applies a set of field changes.
    ///
    /// Status is deliberately absent from [`TaskChanges`]; status moves only
    /// through the workflow engine.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a changed field is invalid. No field
    /// is modified in that case.
    pub fn apply_changes(
        &mut self,
        changes: TaskChanges,
        clock: &impl Clock,
    ) -> Result<(), ValidationError> {
        let title = changes.title.map(validate_title).transpose()?;
        if changes.parent_id == Some(Some(self.id)) {
            return Err(ValidationError::new(
                "parent_id",
                ValidationCode::SelfReference,
            ));
        }

        if let Some(validated) = title {
            self.title = validated;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(parent_id) = changes.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(estimate) = changes.estimate {
            self.estimate = estimate;
        }
        if let Some(time_estimate) = changes.time_estimate {
            self.time_estimate = time_estimate;
        }
        if let Some(actual_time) = changes.actual_time {
            self.actual_time = actual_time;
        }
        if let Some(assignee) = changes.assignee {
            self.assignee = assignee;
        }
        if let Some(labels) = changes.labels {
            self.labels = normalize_labels(labels);
        }
        if let Some(sprint_id) = changes.sprint_id {
            self.sprint_id = sprint_id;
        }
        self.touch(clock.utc());
        Ok(())
    }

    /// Moves the task to `status` at `at`.
    ///
    /// Only the workflow engine calls this, after validating the move.
    pub(crate) fn set_status(&mut self, status: StateId, at: DateTime<Utc>) {
        self.status = status;
        self.touch(at);
    }

    /// Records completion figures.
    pub(crate) const fn set_completion(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }

    /// Replaces the version after the store accepted a write.
    pub(crate) const fn set_version(&mut self, version: TaskVersion) {
        self.version = version;
    }

    const fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Field changes applied by [`Task::apply_changes`].
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New parent.
    pub parent_id: Option<Option<TaskId>>,
    /// New story-point estimate.
    pub estimate: Option<Option<u32>>,
    /// New time estimate.
    pub time_estimate: Option<Option<Minutes>>,
    /// New actual time.
    pub actual_time: Option<Option<Minutes>>,
    /// New assignee.
    pub assignee: Option<Option<ActorId>>,
    /// Replacement label set.
    pub labels: Option<Vec<String>>,
    /// New sprint membership.
    pub sprint_id: Option<Option<SprintId>>,
}

impl TaskChanges {
    /// Returns whether no field is changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn validate_title(title: String) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("title", ValidationCode::Empty));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::new(
            "title",
            ValidationCode::TooLong {
                max: MAX_TITLE_LENGTH,
            },
        ));
    }
    Ok(trimmed.to_owned())
}

fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = labels
        .into_iter()
        .map(|label| label.trim().to_owned())
        .filter(|label| !label.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
