//! Service layer for task creation, field updates and deletion.

use crate::config::EngineConfig;
use crate::task::{
    domain::{
        ActorId, Minutes, NewTaskData, Priority, SprintId, Task, TaskChanges, TaskId, TaskType,
        TaskVersion, ValidationCode, ValidationError,
    },
    ports::{ConflictError, NotFoundError, TaskQuery, TaskStore, TaskStoreError},
};
use crate::workflow::domain::{StateId, StateTransition, Workflow};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    task_type: TaskType,
    title: String,
    reporter: ActorId,
    description: Option<String>,
    status: Option<StateId>,
    priority: Priority,
    parent_id: Option<TaskId>,
    estimate: Option<u32>,
    time_estimate: Option<Minutes>,
    assignee: Option<ActorId>,
    labels: Vec<String>,
    sprint_id: Option<SprintId>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    ///
    /// `reporter` is recorded as the actor of the creation transition.
    #[must_use]
    pub fn new(task_type: TaskType, title: impl Into<String>, reporter: ActorId) -> Self {
        Self {
            task_type,
            title: title.into(),
            reporter,
            description: None,
            status: None,
            priority: Priority::default(),
            parent_id: None,
            estimate: None,
            time_estimate: None,
            assignee: None,
            labels: Vec::new(),
            sprint_id: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides the workflow's initial status.
    #[must_use]
    pub fn with_status(mut self, status: StateId) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the parent task.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the story-point estimate.
    #[must_use]
    pub const fn with_estimate(mut self, points: u32) -> Self {
        self.estimate = Some(points);
        self
    }

    /// Sets the time estimate used as the critical-path duration.
    #[must_use]
    pub const fn with_time_estimate(mut self, estimate: Minutes) -> Self {
        self.time_estimate = Some(estimate);
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: ActorId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Places the task in a sprint.
    #[must_use]
    pub const fn with_sprint(mut self, sprint_id: SprintId) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }
}

/// Request payload for updating task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    task_id: TaskId,
    expected_version: Option<TaskVersion>,
    changes: TaskChanges,
}

impl UpdateTaskRequest {
    /// Creates a request applying `changes` to `task_id`.
    #[must_use]
    pub const fn new(task_id: TaskId, changes: TaskChanges) -> Self {
        Self {
            task_id,
            expected_version: None,
            changes,
        }
    }

    /// Requires the stored task to be at `version`.
    ///
    /// Without it, the version read by the service is used.
    #[must_use]
    pub const fn with_expected_version(mut self, version: TaskVersion) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// Input validation failed; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The task does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The task changed since it was read.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    /// Store operation failed.
    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<TaskStoreError> for TaskServiceError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(not_found) => Self::NotFound(not_found),
            TaskStoreError::Conflict(conflict) => Self::Conflict(conflict),
            other => Self::Store(other),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    workflow: Arc<Workflow>,
    config: EngineConfig,
}

impl<S, C> TaskLifecycleService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        workflow: Arc<Workflow>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            workflow,
            config,
        }
    }

    /// Creates a task and appends its creation record.
    ///
    /// The status defaults to the workflow's initial state. Terminal states
    /// are only reachable through transitions, which record completion.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Validation`] when the title is invalid,
    /// the status is not a workflow state or is terminal, the parent is
    /// missing or the parent chain would exceed the configured depth.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskServiceResult<Task> {
        let status = request
            .status
            .unwrap_or_else(|| self.workflow.initial_state().clone());
        if !self.workflow.contains_state(&status) {
            return Err(ValidationError::new("status", ValidationCode::UnknownState).into());
        }
        if self.workflow.is_terminal(&status) {
            return Err(ValidationError::new("status", ValidationCode::TerminalState).into());
        }
        if let Some(parent_id) = request.parent_id {
            let parent_depth = self.depth_of(parent_id).await?;
            self.ensure_depth(parent_depth + 1)?;
        }

        let reporter = request.reporter;
        let task = Task::new(
            NewTaskData {
                task_type: request.task_type,
                title: request.title,
                description: request.description,
                status: status.clone(),
                priority: request.priority,
                parent_id: request.parent_id,
                estimate: request.estimate,
                time_estimate: request.time_estimate,
                assignee: request.assignee,
                labels: request.labels,
                sprint_id: request.sprint_id,
            },
            &*self.clock,
        )?;
        let record = StateTransition::creation(task.id(), status, reporter, task.created_at());
        self.store.create(&task, &record).await?;
        debug!(task_id = %task.id(), status = %task.status(), "task created");
        Ok(task)
    }

    /// Finds a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when the lookup fails.
    pub async fn find_by_id(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.store.get(id).await?)
    }

    /// Applies field changes under a version check.
    ///
    /// Re-parenting is rejected when it would make the task its own ancestor
    /// or push any descendant beyond the configured depth.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Validation`] for invalid changes,
    /// [`TaskServiceError::NotFound`] for a missing task and
    /// [`TaskServiceError::Conflict`] when the task changed concurrently.
    pub async fn update_task(&self, request: UpdateTaskRequest) -> TaskServiceResult<Task> {
        let UpdateTaskRequest {
            task_id,
            expected_version,
            changes,
        } = request;
        let mut task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| NotFoundError::task(task_id))?;
        let expected = expected_version.unwrap_or_else(|| task.version());

        if let Some(Some(parent_id)) = changes.parent_id {
            self.ensure_valid_parent(task_id, parent_id).await?;
        }
        task.apply_changes(changes, &*self.clock)?;

        let stored = self.store.update_with_version(&task, expected).await?;
        debug!(task_id = %task_id, version = %stored.version(), "task updated");
        Ok(stored)
    }

    /// Hard-deletes a task and its transition log.
    ///
    /// Cancellation through the workflow is the soft alternative.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for a missing task and
    /// [`TaskServiceError::Store`] while other tasks still reference it.
    pub async fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        self.store.delete(id).await?;
        debug!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Returns the number of tasks on the chain from `task_id` to its root,
    /// counting `task_id` itself.
    async fn depth_of(&self, task_id: TaskId) -> TaskServiceResult<usize> {
        Ok(self.ancestors(task_id).await?.len())
    }

    /// Returns `start` followed by its ancestors, nearest first.
    ///
    /// The walk stops after one step more than the configured depth, which
    /// is enough to prove any depth violation.
    async fn ancestors(&self, start: TaskId) -> TaskServiceResult<Vec<TaskId>> {
        let mut chain = Vec::new();
        let mut cursor = Some(start);
        while let Some(current) = cursor {
            if chain.len() > self.config.max_parent_depth || chain.contains(&current) {
                break;
            }
            let task = self
                .store
                .get(current)
                .await?
                .ok_or(ValidationError::new("parent_id", ValidationCode::NotFound))?;
            chain.push(current);
            cursor = task.parent_id();
        }
        Ok(chain)
    }

    /// Height of the subtree rooted at `root`, counting `root` itself.
    async fn subtree_height(&self, root: TaskId) -> TaskServiceResult<usize> {
        let mut height = 1;
        let mut level = vec![root];
        while height <= self.config.max_parent_depth {
            let mut next = Vec::new();
            for parent in level {
                let children = self.store.list_tasks(&TaskQuery::children_of(parent)).await?;
                next.extend(children.iter().map(Task::id));
            }
            if next.is_empty() {
                break;
            }
            height += 1;
            level = next;
        }
        Ok(height)
    }

    async fn ensure_valid_parent(
        &self,
        task_id: TaskId,
        parent_id: TaskId,
    ) -> TaskServiceResult<()> {
        if parent_id == task_id {
            return Err(ValidationError::new("parent_id", ValidationCode::SelfReference).into());
        }
        let chain = self.ancestors(parent_id).await?;
        if chain.contains(&task_id) {
            return Err(ValidationError::new("parent_id", ValidationCode::ParentCycle).into());
        }
        let height = self.subtree_height(task_id).await?;
        self.ensure_depth(chain.len() + height)
    }

    fn ensure_depth(&self, depth: usize) -> TaskServiceResult<()> {
        let max = self.config.max_parent_depth;
        if depth > max {
            return Err(
                ValidationError::new("parent_id", ValidationCode::DepthExceeded { max }).into(),
            );
        }
        Ok(())
    }
}
