//! Report types returned by the metrics service.

use super::aggregate::{Period, TrendBucket};
use crate::task::domain::{ActorId, SprintId, TaskId};
use crate::task::ports::TaskQuery;
use crate::workflow::domain::StateId;
use chrono::TimeDelta;
use std::collections::BTreeMap;

/// Set of tasks a metrics report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsScope {
    /// Every task.
    All,
    /// Tasks in one sprint.
    Sprint(SprintId),
    /// Tasks assigned to any of the listed actors.
    Assignees(Vec<ActorId>),
}

impl MetricsScope {
    /// Returns the store query selecting the scope's tasks.
    #[must_use]
    pub fn to_query(&self) -> TaskQuery {
        match self {
            Self::All => TaskQuery::all(),
            Self::Sprint(sprint_id) => TaskQuery::in_sprint(*sprint_id),
            Self::Assignees(assignees) => TaskQuery::assigned_to(assignees.iter().cloned()),
        }
    }
}

/// Aggregate report over a scope and period.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    /// Covered tasks.
    pub scope: MetricsScope,
    /// Reporting window.
    pub period: Period,
    /// Number of tasks in scope.
    pub task_count: usize,
    /// Tasks delivered within the period.
    pub delivered: usize,
    /// Story points delivered within the period.
    pub velocity: u64,
    /// Delivered tasks per week.
    pub throughput: f64,
    /// Tasks currently in an in-progress-category state.
    pub wip: usize,
    /// Mean cycle time of tasks delivered within the period.
    pub average_cycle_time: Option<TimeDelta>,
    /// Mean lead time of tasks delivered within the period.
    pub average_lead_time: Option<TimeDelta>,
    /// Time tasks in scope spent in each status between the start of the
    /// period and its end or now, whichever comes first.
    pub time_in_status: BTreeMap<StateId, TimeDelta>,
    /// Per-bucket cycle and lead time statistics.
    pub trends: Vec<TrendBucket>,
}

/// Timing figures for one task derived from its transition log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetrics {
    /// Task the figures belong to.
    pub task_id: TaskId,
    /// Status reached by the last log record.
    pub current_status: Option<StateId>,
    /// Time spent in each status so far.
    pub time_in_status: BTreeMap<StateId, TimeDelta>,
    /// Cycle time, once the task is done.
    pub cycle_time: Option<TimeDelta>,
    /// Lead time, once the task is done.
    pub lead_time: Option<TimeDelta>,
}
