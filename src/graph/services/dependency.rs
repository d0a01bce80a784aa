//! Service layer for dependency edges and critical-path analysis.

use crate::config::EngineConfig;
use crate::graph::domain::{
    CircularDependencyError, CriticalPath, DependencyGraph, DependencyType, TaskDependency,
    compute_critical_path,
};
use crate::task::{
    domain::{Minutes, TaskId, ValidationError},
    ports::{NotFoundError, TaskQuery, TaskStore, TaskStoreError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Request payload for adding a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddDependencyRequest {
    task_id: TaskId,
    depends_on_id: TaskId,
    dependency_type: DependencyType,
    lag: Minutes,
}

impl AddDependencyRequest {
    /// Creates a finish-to-start request without lag.
    #[must_use]
    pub fn new(task_id: TaskId, depends_on_id: TaskId) -> Self {
        Self {
            task_id,
            depends_on_id,
            dependency_type: DependencyType::default(),
            lag: Minutes::ZERO,
        }
    }

    /// Sets the dependency type.
    #[must_use]
    pub const fn with_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    /// Sets the lag; negative values are leads.
    #[must_use]
    pub const fn with_lag(mut self, lag: Minutes) -> Self {
        self.lag = lag;
        self
    }
}

/// Errors raised by [`DependencyService`].
#[derive(Debug, Error)]
pub enum GraphServiceError {
    /// The edge is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The edge would close a cycle; nothing was written.
    #[error(transparent)]
    CircularDependency(#[from] CircularDependencyError),
    /// A referenced task does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// Store operation failed.
    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<TaskStoreError> for GraphServiceError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::CircularDependency(cycle) => Self::CircularDependency(cycle),
            TaskStoreError::NotFound(not_found) => Self::NotFound(not_found),
            other => Self::Store(other),
        }
    }
}

/// Result type for dependency service operations.
pub type GraphServiceResult<T> = Result<T, GraphServiceError>;

#[derive(Debug, Clone)]
struct CachedPath {
    scope: BTreeSet<TaskId>,
    computed_at: DateTime<Utc>,
    path: Arc<CriticalPath>,
}

/// Maintains dependency edges and serves critical-path queries.
///
/// Critical paths are cached per task scope and recomputed at most once per
/// configured refresh interval. Edge changes made through this service drop
/// the cache; changes made elsewhere become visible after the interval.
pub struct DependencyService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    config: EngineConfig,
    cache: RwLock<Option<CachedPath>>,
}

impl<S, C> DependencyService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a new dependency service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
            cache: RwLock::new(None),
        }
    }

    /// Adds a dependency edge after checking it cannot close a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`GraphServiceError::Validation`] for a self-dependency,
    /// [`GraphServiceError::CircularDependency`] carrying the cycle the edge
    /// would close and [`GraphServiceError::NotFound`] for a missing task.
    pub async fn add_dependency(
        &self,
        request: AddDependencyRequest,
    ) -> GraphServiceResult<TaskDependency> {
        let dependency = TaskDependency::new(
            request.task_id,
            request.depends_on_id,
            request.dependency_type,
            request.lag,
        )?;
        if let Err(err) = self.store.insert_dependency(&dependency).await {
            if let TaskStoreError::CircularDependency(cycle) = &err {
                warn!(
                    task_id = %request.task_id,
                    depends_on_id = %request.depends_on_id,
                    cycle = %cycle,
                    "dependency rejected"
                );
            }
            return Err(err.into());
        }
        self.invalidate();
        debug!(
            task_id = %request.task_id,
            depends_on_id = %request.depends_on_id,
            dependency_type = %request.dependency_type,
            "dependency added"
        );
        Ok(dependency)
    }

    /// Removes a dependency edge, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphServiceError::Store`] when the store fails.
    pub async fn remove_dependency(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> GraphServiceResult<bool> {
        let removed = self
            .store
            .remove_dependency(task_id, depends_on_id)
            .await?;
        if removed {
            self.invalidate();
            debug!(task_id = %task_id, depends_on_id = %depends_on_id, "dependency removed");
        }
        Ok(removed)
    }

    /// Returns the edges in which `task_id` is either endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GraphServiceError::Store`] when the store fails.
    pub async fn dependencies_of(&self, task_id: TaskId) -> GraphServiceResult<Vec<TaskDependency>> {
        Ok(self.store.list_edges(task_id).await?)
    }

    /// Computes the critical path over `task_ids` and the edges among them.
    ///
    /// Each task's duration is its time estimate, zero when absent. A result
    /// computed for the same scope within the refresh interval is reused.
    ///
    /// # Errors
    ///
    /// Returns [`GraphServiceError::NotFound`] for an unknown task and
    /// [`GraphServiceError::CircularDependency`] when stored edges are
    /// cyclic.
    pub async fn compute_critical_path(
        &self,
        task_ids: &[TaskId],
    ) -> GraphServiceResult<Arc<CriticalPath>> {
        let scope: BTreeSet<TaskId> = task_ids.iter().copied().collect();
        let now = self.clock.utc();
        if let Some(cached) = self.cached(&scope, now) {
            return Ok(cached);
        }

        let tasks = self
            .store
            .list_tasks(&TaskQuery::by_ids(scope.iter().copied()))
            .await?;
        if let Some(missing) = scope
            .iter()
            .find(|id| !tasks.iter().any(|task| task.id() == **id))
        {
            return Err(NotFoundError::task(*missing).into());
        }
        let durations: BTreeMap<TaskId, Minutes> = tasks
            .iter()
            .map(|task| (task.id(), task.time_estimate().unwrap_or_default()))
            .collect();
        let edges = self.store.all_edges().await?;

        let path = Arc::new(compute_critical_path(&durations, edges)?);
        debug!(
            tasks = scope.len(),
            critical = path.path.len(),
            duration = %path.project_duration,
            "critical path computed"
        );
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(CachedPath {
                scope,
                computed_at: now,
                path: Arc::clone(&path),
            });
        }
        Ok(path)
    }

    /// Computes the critical path over every stored task.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`DependencyService::compute_critical_path`].
    pub async fn compute_project_critical_path(&self) -> GraphServiceResult<Arc<CriticalPath>> {
        let ids: Vec<TaskId> = self
            .store
            .list_tasks(&TaskQuery::all())
            .await?
            .iter()
            .map(crate::task::domain::Task::id)
            .collect();
        self.compute_critical_path(&ids).await
    }

    /// Lists every cycle in the stored edge set.
    ///
    /// Edges inserted through [`DependencyService::add_dependency`] are
    /// always acyclic; this diagnoses data imported by other means.
    ///
    /// # Errors
    ///
    /// Returns [`GraphServiceError::Store`] when the store fails.
    pub async fn detect_cycles(&self) -> GraphServiceResult<Vec<Vec<TaskId>>> {
        let graph = DependencyGraph::from_edges(self.store.all_edges().await?);
        let cycles = graph.detect_cycles();
        if !cycles.is_empty() {
            warn!(count = cycles.len(), "stored dependency edges contain cycles");
        }
        Ok(cycles)
    }

    fn cached(&self, scope: &BTreeSet<TaskId>, now: DateTime<Utc>) -> Option<Arc<CriticalPath>> {
        let cache = self.cache.read().ok()?;
        let entry = cache.as_ref()?;
        let fresh = now - entry.computed_at < self.config.critical_path_refresh();
        (fresh && entry.scope == *scope).then(|| Arc::clone(&entry.path))
    }

    fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            *cache = None;
        }
    }
}
