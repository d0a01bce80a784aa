//! Service layer for sprint planning, progress tracking and risk.

use crate::config::EngineConfig;
use crate::graph::domain::{CircularDependencyError, CriticalPath, compute_critical_path};
use crate::metrics::domain::is_delivered;
use crate::sprint::{
    domain::{
        BurndownPoint, CapacityExceededError, NewSprintData, RiskInputs, RiskLevel, Sprint,
        SprintRisk, SprintStateError, SprintStatus, assess_risk, sum_points,
    },
    ports::{SprintConflictError, SprintRepository, SprintRepositoryError},
};
use crate::task::{
    domain::{Minutes, SprintId, Task, TaskChanges, TaskId, ValidationError},
    ports::{ConflictError, NotFoundError, TaskQuery, TaskStore, TaskStoreError},
};
use crate::workflow::domain::{StateCategory, Workflow};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Attempts made for a compensating or detaching write before a version
/// conflict is surfaced.
const WRITE_ATTEMPTS: u32 = 5;

/// Request payload for creating a sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSprintRequest {
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    capacity: u32,
}

impl CreateSprintRequest {
    /// Creates a request for a sprint running from `start_date` to
    /// `end_date` inclusive with `capacity` story points.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        capacity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date,
            capacity,
        }
    }
}

/// Outcome of closing a sprint.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintReport {
    /// The closed sprint.
    pub sprint: Sprint,
    /// Unfinished tasks detached from the sprint.
    pub carried_over: Vec<TaskId>,
}

/// Errors raised by [`SprintPlanner`].
#[derive(Debug, Error)]
pub enum SprintServiceError {
    /// Request data failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The sprint cannot absorb the task.
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceededError),
    /// The operation does not fit the sprint's status.
    #[error(transparent)]
    InvalidState(#[from] SprintStateError),
    /// A sprint or task does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// A task was modified concurrently.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    /// The sprint was modified concurrently.
    #[error(transparent)]
    SprintConflict(#[from] SprintConflictError),
    /// Stored dependency edges are cyclic.
    #[error(transparent)]
    CircularDependency(#[from] CircularDependencyError),
    /// Sprint repository operation failed.
    #[error(transparent)]
    Repository(SprintRepositoryError),
    /// Task store operation failed.
    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<SprintRepositoryError> for SprintServiceError {
    fn from(err: SprintRepositoryError) -> Self {
        match err {
            SprintRepositoryError::NotFound(id) => Self::NotFound(NotFoundError::sprint(id)),
            SprintRepositoryError::Conflict(conflict) => Self::SprintConflict(conflict),
            other => Self::Repository(other),
        }
    }
}

impl From<TaskStoreError> for SprintServiceError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(not_found) => Self::NotFound(not_found),
            TaskStoreError::Conflict(conflict) => Self::Conflict(conflict),
            TaskStoreError::CircularDependency(cycle) => Self::CircularDependency(cycle),
            other => Self::Store(other),
        }
    }
}

/// Result type for sprint service operations.
pub type SprintServiceResult<T> = Result<T, SprintServiceError>;

/// Plans sprints and tracks their progress against the task store.
#[derive(Clone)]
pub struct SprintPlanner<S, R, C>
where
    S: TaskStore,
    R: SprintRepository,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    sprints: Arc<R>,
    clock: Arc<C>,
    workflow: Arc<Workflow>,
    config: EngineConfig,
}

impl<S, R, C> SprintPlanner<S, R, C>
where
    S: TaskStore,
    R: SprintRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new sprint planner.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        sprints: Arc<R>,
        clock: Arc<C>,
        workflow: Arc<Workflow>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sprints,
            clock,
            workflow,
            config,
        }
    }

    /// Creates a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::Validation`] for an empty name or an end
    /// date before the start date.
    pub async fn create_sprint(&self, request: CreateSprintRequest) -> SprintServiceResult<Sprint> {
        let sprint = Sprint::new(
            NewSprintData {
                name: request.name,
                start_date: request.start_date,
                end_date: request.end_date,
                capacity: request.capacity,
            },
            &*self.clock,
        )?;
        self.sprints.store(&sprint).await?;
        debug!(sprint_id = %sprint.id(), capacity = sprint.capacity(), "sprint created");
        Ok(sprint)
    }

    /// Finds a sprint by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::Repository`] when the repository fails.
    pub async fn find_by_id(&self, id: SprintId) -> SprintServiceResult<Option<Sprint>> {
        Ok(self.sprints.find_by_id(id).await?)
    }

    /// Adds a task to a sprint, counting its estimate against capacity.
    ///
    /// Before the sprint starts the points join the commitment; afterwards
    /// they count as scope change. Assigning a task already in the sprint is a
    /// no-op.
    ///
    /// The points are reserved on the sprint before the task row is written.
    /// When the task write fails the reservation is released again.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::CapacityExceeded`] when the estimate does
    /// not fit, [`SprintServiceError::InvalidState`] for a completed sprint,
    /// [`SprintServiceError::NotFound`] for a missing sprint or task and
    /// [`SprintServiceError::SprintConflict`] or
    /// [`SprintServiceError::Conflict`] when the sprint or task changed
    /// concurrently.
    pub async fn assign_task(
        &self,
        sprint_id: SprintId,
        task_id: TaskId,
    ) -> SprintServiceResult<Sprint> {
        let sprint = self.load_sprint(sprint_id).await?;
        let task = self.load_task(task_id).await?;
        if task.sprint_id() == Some(sprint_id) {
            return Ok(sprint);
        }

        let points = task.estimate().unwrap_or_default();
        if let Err(err) = sprint.check_capacity(points, self.config.overcommit_factor) {
            warn!(
                sprint_id = %sprint_id,
                task_id = %task_id,
                current = err.current,
                required = err.required,
                "sprint capacity exceeded"
            );
            return Err(err.into());
        }
        let mut assigned = task.clone();
        assigned.apply_changes(
            TaskChanges {
                sprint_id: Some(Some(sprint_id)),
                ..TaskChanges::default()
            },
            &*self.clock,
        )?;

        let counted_while = sprint.status();
        let mut reserving = sprint.clone();
        reserving.add_points(points)?;
        let reserved = self
            .sprints
            .update_with_version(&reserving, sprint.version())
            .await?;

        if let Err(err) = self.store.update_with_version(&assigned, task.version()).await {
            if let Err(release_err) = self.release_points(sprint_id, points, counted_while).await {
                warn!(
                    sprint_id = %sprint_id,
                    task_id = %task_id,
                    points,
                    error = %release_err,
                    "reserved sprint points could not be released"
                );
            }
            return Err(err.into());
        }
        debug!(
            sprint_id = %sprint_id,
            task_id = %task_id,
            points,
            status = %reserved.status(),
            "task assigned to sprint"
        );
        Ok(reserved)
    }

    /// Starts a planned sprint, locking its commitment.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::InvalidState`] unless the sprint is
    /// planned.
    pub async fn start_sprint(&self, sprint_id: SprintId) -> SprintServiceResult<Sprint> {
        let mut sprint = self.load_sprint(sprint_id).await?;
        let expected = sprint.version();
        sprint.start(self.clock.utc())?;
        let started = self.sprints.update_with_version(&sprint, expected).await?;
        info!(
            sprint_id = %sprint_id,
            committed = started.committed_points(),
            "sprint started"
        );
        Ok(started)
    }

    /// Samples today's remaining work into the burndown and refreshes the
    /// delivered points.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::InvalidState`] unless the sprint is
    /// active.
    pub async fn record_burndown(&self, sprint_id: SprintId) -> SprintServiceResult<BurndownPoint> {
        let mut sprint = self.load_sprint(sprint_id).await?;
        let expected = sprint.version();
        let tasks = self.sprint_tasks(sprint_id).await?;
        let remaining = sum_points(
            tasks
                .iter()
                .filter(|task| !self.workflow.is_terminal(task.status()))
                .map(Task::estimate),
        );
        let point = sprint.burndown_point(self.clock.utc().date_naive(), remaining);
        sprint.record_burndown(point)?;
        sprint.record_completion(self.delivered_points(&tasks));
        self.sprints.update_with_version(&sprint, expected).await?;
        debug!(
            sprint_id = %sprint_id,
            remaining,
            ideal = point.ideal_remaining,
            "burndown recorded"
        );
        Ok(point)
    }

    /// Closes an active sprint.
    ///
    /// Delivered estimates become completed points. Tasks not in a
    /// done-category state are detached from the sprint and their estimates
    /// become carryover points.
    ///
    /// The closed sprint is written before any task. Detaching skips tasks
    /// that already left the sprint and rereads a task whose row changed.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::InvalidState`] unless the sprint is
    /// active, [`SprintServiceError::SprintConflict`] when the sprint changed
    /// concurrently and [`SprintServiceError::Conflict`] when a carried task
    /// kept changing while it was detached.
    pub async fn close_sprint(&self, sprint_id: SprintId) -> SprintServiceResult<SprintReport> {
        let mut sprint = self.load_sprint(sprint_id).await?;
        let expected = sprint.version();
        let tasks = self.sprint_tasks(sprint_id).await?;
        let unfinished: Vec<&Task> = tasks
            .iter()
            .filter(|task| !self.workflow.is_terminal(task.status()))
            .collect();
        let carryover = sum_points(unfinished.iter().copied().map(Task::estimate));
        sprint.close(self.delivered_points(&tasks), carryover, self.clock.utc())?;
        let closed = self.sprints.update_with_version(&sprint, expected).await?;

        let mut carried_over = Vec::with_capacity(unfinished.len());
        for task in unfinished {
            if self.detach_task(task.id(), sprint_id).await? {
                carried_over.push(task.id());
            }
        }
        info!(
            sprint_id = %sprint_id,
            completed = closed.completed_points(),
            carryover = closed.carryover_points(),
            completion_rate = closed.completion_rate(),
            "sprint closed"
        );
        Ok(SprintReport {
            sprint: closed,
            carried_over,
        })
    }

    /// Scores the sprint's delivery risk.
    ///
    /// Counts tasks in blocking states, compares the latest burndown sample
    /// with the ideal line and finds critical-path tasks that have passed
    /// their latest start while not started, or their latest finish while
    /// unfinished. Schedule offsets are measured from the sprint's first
    /// day.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::CircularDependency`] when the stored
    /// edges among the sprint's tasks are cyclic.
    pub async fn assess_risk(&self, sprint_id: SprintId) -> SprintServiceResult<SprintRisk> {
        let sprint = self.load_sprint(sprint_id).await?;
        let tasks = self.sprint_tasks(sprint_id).await?;
        let blocked_tasks = tasks
            .iter()
            .filter(|task| self.workflow.is_blocked(task.status()))
            .count();

        let durations: BTreeMap<TaskId, Minutes> = tasks
            .iter()
            .map(|task| (task.id(), task.time_estimate().unwrap_or_default()))
            .collect();
        let critical = compute_critical_path(&durations, self.store.all_edges().await?)?;
        let critical_tasks_behind =
            self.critical_tasks_behind(&tasks, &critical, sprint.starts_at(), self.clock.utc());

        let risk = assess_risk(
            &sprint,
            RiskInputs {
                blocked_tasks,
                critical_tasks_behind,
            },
            &self.config,
        );
        if risk.level == RiskLevel::High {
            warn!(sprint_id = %sprint_id, factors = risk.factors.len(), "sprint at high risk");
        } else {
            debug!(sprint_id = %sprint_id, level = ?risk.level, "sprint risk assessed");
        }
        Ok(risk)
    }

    fn critical_tasks_behind(
        &self,
        tasks: &[Task],
        critical: &CriticalPath,
        sprint_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<TaskId> {
        tasks
            .iter()
            .filter(|task| critical.contains(task.id()))
            .filter(|task| !self.workflow.is_terminal(task.status()))
            .filter(|task| {
                critical.schedule.get(&task.id()).is_some_and(|schedule| {
                    let not_started = self
                        .workflow
                        .is_in_category(task.status(), StateCategory::Todo);
                    let late_start =
                        not_started && now > sprint_start + schedule.latest_start.to_time_delta();
                    late_start || now > sprint_start + schedule.latest_finish.to_time_delta()
                })
            })
            .map(Task::id)
            .collect()
    }

    /// Clears the sprint of `task_id` if it still belongs to `sprint_id`,
    /// returning whether this call detached it.
    async fn detach_task(&self, task_id: TaskId, sprint_id: SprintId) -> SprintServiceResult<bool> {
        let mut attempt: u32 = 1;
        loop {
            let Some(task) = self.store.get(task_id).await? else {
                return Ok(false);
            };
            if task.sprint_id() != Some(sprint_id) {
                return Ok(false);
            }
            let mut detached = task.clone();
            detached.apply_changes(
                TaskChanges {
                    sprint_id: Some(None),
                    ..TaskChanges::default()
                },
                &*self.clock,
            )?;
            match self.store.update_with_version(&detached, task.version()).await {
                Ok(_) => return Ok(true),
                Err(TaskStoreError::Conflict(conflict)) if attempt < WRITE_ATTEMPTS => {
                    debug!(task_id = %task_id, %conflict, attempt, "retrying sprint detach");
                    attempt = attempt.saturating_add(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Takes reserved points back off the sprint, rereading it on conflict.
    async fn release_points(
        &self,
        sprint_id: SprintId,
        points: u32,
        counted_while: SprintStatus,
    ) -> SprintServiceResult<()> {
        let mut attempt: u32 = 1;
        loop {
            let mut sprint = self.load_sprint(sprint_id).await?;
            let expected = sprint.version();
            sprint.release_points(points, counted_while)?;
            match self.sprints.update_with_version(&sprint, expected).await {
                Ok(_) => return Ok(()),
                Err(SprintRepositoryError::Conflict(conflict)) if attempt < WRITE_ATTEMPTS => {
                    debug!(sprint_id = %sprint_id, %conflict, attempt, "retrying point release");
                    attempt = attempt.saturating_add(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn delivered_points(&self, tasks: &[Task]) -> u32 {
        sum_points(
            tasks
                .iter()
                .filter(|task| is_delivered(task, &self.workflow))
                .map(Task::estimate),
        )
    }

    async fn sprint_tasks(&self, sprint_id: SprintId) -> SprintServiceResult<Vec<Task>> {
        Ok(self.store.list_tasks(&TaskQuery::in_sprint(sprint_id)).await?)
    }

    async fn load_sprint(&self, sprint_id: SprintId) -> SprintServiceResult<Sprint> {
        self.sprints
            .find_by_id(sprint_id)
            .await?
            .ok_or_else(|| NotFoundError::sprint(sprint_id).into())
    }

    async fn load_task(&self, task_id: TaskId) -> SprintServiceResult<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| NotFoundError::task(task_id).into())
    }
}
