//! Service that loads tasks and logs and folds them into reports.

use crate::config::EngineConfig;
use crate::metrics::domain::{
    MetricsScope, MetricsSummary, Period, PeriodError, TaskMetrics,
    aggregate::{self, mean_duration},
    timeline,
};
use crate::task::{
    domain::{Task, TaskId},
    ports::{NotFoundError, TaskStore, TaskStoreError},
};
use crate::workflow::domain::{StateId, Workflow};
use chrono::{TimeDelta, Utc};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised by [`MetricsCalculator`].
#[derive(Debug, Error)]
pub enum MetricsServiceError {
    /// The reporting period is empty.
    #[error(transparent)]
    Period(#[from] PeriodError),
    /// The task does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Result type for metrics service operations.
pub type MetricsServiceResult<T> = Result<T, MetricsServiceError>;

/// Read-only analytics over the task store.
#[derive(Clone)]
pub struct MetricsCalculator<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    workflow: Arc<Workflow>,
    config: EngineConfig,
}

impl<S, C> MetricsCalculator<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a new metrics calculator.
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

    /// Builds the aggregate report for `scope` over `period`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsServiceError::Store`] when loading fails.
    pub async fn get_metrics(
        &self,
        scope: MetricsScope,
        period: Period,
    ) -> MetricsServiceResult<MetricsSummary> {
        let tasks = self.store.list_tasks(&scope.to_query()).await?;
        let as_of = period.end().min(self.clock.utc());

        let mut time_in_status: BTreeMap<StateId, TimeDelta> = BTreeMap::new();
        for task in &tasks {
            let log = self.store.transitions(task.id()).await?;
            let spent_by_status = timeline::time_in_states_between(&log, period.start(), as_of);
            for (status, spent) in spent_by_status {
                *time_in_status.entry(status).or_insert_with(TimeDelta::zero) += spent;
            }
        }

        let delivered: Vec<&Task> =
            aggregate::delivered_in(&tasks, &self.workflow, period).collect();
        let cycle_times: Vec<TimeDelta> = delivered
            .iter()
            .filter_map(|task| task.completion().map(|done| done.cycle_time))
            .collect();
        let lead_times: Vec<TimeDelta> = delivered
            .iter()
            .filter_map(|task| task.completion().map(|done| done.lead_time))
            .collect();

        let summary = MetricsSummary {
            task_count: tasks.len(),
            delivered: delivered.len(),
            velocity: aggregate::velocity(&tasks, &self.workflow, period),
            throughput: aggregate::throughput(&tasks, &self.workflow, period),
            wip: aggregate::wip(&tasks, &self.workflow),
            average_cycle_time: mean_duration(&cycle_times),
            average_lead_time: mean_duration(&lead_times),
            time_in_status,
            trends: aggregate::trends(
                &tasks,
                &self.workflow,
                period,
                self.config.trend_bucket(),
            ),
            scope,
            period,
        };
        debug!(
            tasks = summary.task_count,
            delivered = summary.delivered,
            velocity = summary.velocity,
            "metrics computed"
        );
        Ok(summary)
    }

    /// Builds the aggregate report for the `days` ending now.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsServiceError::Period`] when `days` is zero and the
    /// errors of [`MetricsCalculator::get_metrics`].
    pub async fn get_recent_metrics(
        &self,
        scope: MetricsScope,
        days: u32,
    ) -> MetricsServiceResult<MetricsSummary> {
        let end = self.clock.utc();
        let start = TimeDelta::try_days(i64::from(days))
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        self.get_metrics(scope, Period::new(start, end)?).await
    }

    /// Derives timing figures for one task from its log.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsServiceError::NotFound`] for a missing task.
    pub async fn task_metrics(&self, task_id: TaskId) -> MetricsServiceResult<TaskMetrics> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| NotFoundError::task(task_id))?;
        let log = self.store.transitions(task_id).await?;
        Ok(TaskMetrics {
            task_id,
            current_status: timeline::current_status(&log).cloned(),
            time_in_status: timeline::time_in_states(&log, self.clock.utc()),
            cycle_time: timeline::cycle_time(&log, &self.workflow),
            lead_time: timeline::lead_time(&log, task.created_at(), &self.workflow),
        })
    }
}
