//! Service that validates and applies status transitions.

use crate::metrics::domain::timeline;
use crate::task::{
    domain::{Completion, Task, TaskId},
    ports::{ConflictError, NotFoundError, TaskQuery, TaskStore, TaskStoreError},
};
use crate::workflow::{
    domain::{
        ActionContext, Actor, ConditionInput, PostAction, StateCategory, StateId, StateTransition,
        TransitionTrigger, Workflow, WorkflowValidationError,
    },
    ports::{AutomationDispatcher, DispatchError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    to_status: StateId,
    actor: Actor,
    approvals: u32,
    trigger: TransitionTrigger,
}

impl TransitionRequest {
    /// Creates a manual transition request by `actor`.
    #[must_use]
    pub const fn new(to_status: StateId, actor: Actor) -> Self {
        Self {
            to_status,
            actor,
            approvals: 0,
            trigger: TransitionTrigger::Manual,
        }
    }

    /// Sets the number of approvals collected for the move.
    #[must_use]
    pub const fn with_approvals(mut self, approvals: u32) -> Self {
        self.approvals = approvals;
        self
    }

    /// Sets what caused the move.
    #[must_use]
    pub const fn triggered_by(mut self, trigger: TransitionTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Returns the target status.
    #[must_use]
    pub const fn to_status(&self) -> &StateId {
        &self.to_status
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Result of an applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Task as stored after the transition.
    pub task: Task,
    /// Appended log record.
    pub record: StateTransition,
    /// Post actions that failed to dispatch.
    pub warnings: Vec<DispatchError>,
}

/// Errors raised by [`WorkflowEngine`].
#[derive(Debug, Error)]
pub enum WorkflowEngineError {
    /// The transition is not permitted; nothing was written.
    #[error(transparent)]
    Validation(#[from] WorkflowValidationError),
    /// The task does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The task changed since it was read; nothing was written.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    /// The workflow defines no cancel state.
    #[error("workflow {workflow} has no cancel state")]
    NoCancelState {
        /// Workflow name.
        workflow: String,
    },
    /// Store operation failed.
    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<TaskStoreError> for WorkflowEngineError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(not_found) => Self::NotFound(not_found),
            TaskStoreError::Conflict(conflict) => Self::Conflict(conflict),
            other => Self::Store(other),
        }
    }
}

/// Result type for workflow engine operations.
pub type WorkflowEngineResult<T> = Result<T, WorkflowEngineError>;

/// Applies validated status transitions and dispatches their post actions.
#[derive(Clone)]
pub struct WorkflowEngine<S, D, C>
where
    S: TaskStore,
    D: AutomationDispatcher,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    dispatcher: Arc<D>,
    clock: Arc<C>,
    workflow: Arc<Workflow>,
}

impl<S, D, C> WorkflowEngine<S, D, C>
where
    S: TaskStore,
    D: AutomationDispatcher,
    C: Clock + Send + Sync,
{
    /// Creates an engine bound to `workflow`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        dispatcher: Arc<D>,
        clock: Arc<C>,
        workflow: Arc<Workflow>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            workflow,
        }
    }

    /// Returns the workflow the engine enforces.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Checks whether `request` may be applied to `task`, writing nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::Validation`] listing every violated
    /// rule.
    pub async fn validate_transition(
        &self,
        task: &Task,
        request: &TransitionRequest,
    ) -> WorkflowEngineResult<()> {
        let unresolved = self.unresolved_dependencies(task.id()).await?;
        self.check(task, request, &unresolved)?;
        Ok(())
    }

    /// Validates and applies `request` to the `task` snapshot.
    ///
    /// The status update and the log record are committed together under a
    /// check-and-set on the snapshot's version. Entering a done-category
    /// state also records completion, cycle time and lead time. Post actions
    /// run after the commit; their failures are returned as warnings.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::Validation`] when the move is not
    /// permitted and [`WorkflowEngineError::Conflict`] when the task changed
    /// since the snapshot was read. Nothing is written in either case.
    pub async fn apply_transition(
        &self,
        task: &Task,
        request: TransitionRequest,
    ) -> WorkflowEngineResult<TransitionOutcome> {
        let unresolved = self.unresolved_dependencies(task.id()).await?;
        let post_actions = self.check(task, &request, &unresolved)?;

        let now = self.clock.utc();
        let mut log = self.store.transitions(task.id()).await?;
        let duration_in_state =
            timeline::last_entered(&log, task.status()).map(|entered| now - entered);
        let record = StateTransition::change(
            task.id(),
            task.status().clone(),
            request.to_status.clone(),
            request.actor.id().clone(),
            now,
            request.trigger,
            duration_in_state,
        );

        let mut updated = task.clone();
        updated.set_status(request.to_status.clone(), now);
        if self.workflow.is_terminal(&request.to_status) {
            log.push(record.clone());
            updated.set_completion(Completion {
                completed_at: now,
                cycle_time: timeline::cycle_time(&log, &self.workflow).unwrap_or_default(),
                lead_time: timeline::lead_time(&log, task.created_at(), &self.workflow)
                    .unwrap_or_default(),
            });
        }

        let stored = match self
            .store
            .commit_transition(&updated, task.version(), &record)
            .await
        {
            Ok(stored) => stored,
            Err(TaskStoreError::Conflict(conflict)) => {
                warn!(
                    task_id = %task.id(),
                    expected = %conflict.expected_version,
                    actual = %conflict.actual_version,
                    "transition lost a concurrent update"
                );
                return Err(conflict.into());
            }
            Err(other) => return Err(other.into()),
        };
        info!(
            task_id = %task.id(),
            from = %task.status(),
            to = %request.to_status,
            actor = %request.actor.id(),
            "task transitioned"
        );

        let context = ActionContext {
            task_id: task.id(),
            from_status: task.status().clone(),
            to_status: request.to_status,
            actor_id: request.actor.id().clone(),
            transitioned_at: now,
        };
        let warnings = self.dispatch_all(&post_actions, &context).await;

        Ok(TransitionOutcome {
            task: stored,
            record,
            warnings,
        })
    }

    /// Loads a task and applies `request` to it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::NotFound`] for a missing task and the
    /// errors of [`WorkflowEngine::apply_transition`].
    pub async fn transition_task(
        &self,
        task_id: TaskId,
        request: TransitionRequest,
    ) -> WorkflowEngineResult<TransitionOutcome> {
        let task = self.load(task_id).await?;
        self.apply_transition(&task, request).await
    }

    /// Soft-deletes a task by moving it to the workflow's cancel state.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::NoCancelState`] when the workflow has
    /// no cancel state and the errors of [`WorkflowEngine::transition_task`].
    pub async fn cancel_task(
        &self,
        task_id: TaskId,
        actor: Actor,
    ) -> WorkflowEngineResult<TransitionOutcome> {
        let cancel_state = self.workflow.cancel_state().cloned().ok_or_else(|| {
            WorkflowEngineError::NoCancelState {
                workflow: self.workflow.name().to_owned(),
            }
        })?;
        self.transition_task(task_id, TransitionRequest::new(cancel_state, actor))
            .await
    }

    /// Returns the ordered transition log of a task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::NotFound`] for a missing task.
    pub async fn history(&self, task_id: TaskId) -> WorkflowEngineResult<Vec<StateTransition>> {
        self.load(task_id).await?;
        Ok(self.store.transitions(task_id).await?)
    }

    async fn load(&self, task_id: TaskId) -> WorkflowEngineResult<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| NotFoundError::task(task_id).into())
    }

    fn check(
        &self,
        task: &Task,
        request: &TransitionRequest,
        unresolved: &[TaskId],
    ) -> Result<Vec<PostAction>, WorkflowValidationError> {
        let input = ConditionInput {
            task,
            actor: &request.actor,
            approvals: request.approvals,
            unresolved_dependencies: unresolved,
        };
        self.workflow
            .validate_transition(&input, &request.to_status)
            .map(|transition| transition.post_actions.clone())
    }

    /// Predecessors of `task_id` that are not in a done-category state.
    async fn unresolved_dependencies(&self, task_id: TaskId) -> WorkflowEngineResult<Vec<TaskId>> {
        let predecessors: Vec<TaskId> = self
            .store
            .list_edges(task_id)
            .await?
            .into_iter()
            .filter(|edge| edge.task_id() == task_id)
            .map(|edge| edge.depends_on_id())
            .collect();
        if predecessors.is_empty() {
            return Ok(Vec::new());
        }
        let resolved: Vec<TaskId> = self
            .store
            .list_tasks(&TaskQuery::by_ids(predecessors.iter().copied()))
            .await?
            .into_iter()
            .filter(|task| {
                self.workflow
                    .is_in_category(task.status(), StateCategory::Done)
            })
            .map(|task| task.id())
            .collect();
        Ok(predecessors
            .into_iter()
            .filter(|id| !resolved.contains(id))
            .collect())
    }

    async fn dispatch_all(
        &self,
        actions: &[PostAction],
        context: &ActionContext,
    ) -> Vec<DispatchError> {
        let mut warnings = Vec::new();
        for action in actions {
            if let Err(err) = self.dispatcher.dispatch(action, context).await {
                warn!(
                    task_id = %context.task_id,
                    action = action.kind(),
                    error = %err,
                    "post-transition action failed"
                );
                warnings.push(err);
            }
        }
        warnings
    }
}
