//! Team and sprint level aggregates over task snapshots.

use crate::task::domain::Task;
use crate::workflow::domain::{StateCategory, Workflow};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Half-open reporting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// The period ends at or before it starts.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("period end {end} must be after start {start}")]
pub struct PeriodError {
    /// Requested start.
    pub start: DateTime<Utc>,
    /// Requested end.
    pub end: DateTime<Utc>,
}

impl Period {
    /// Creates a period.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError`] unless `end` is after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PeriodError> {
        if end <= start {
            return Err(PeriodError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the inclusive start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the exclusive end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns whether `at` falls inside the period.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Returns the period length.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns the period length in fractional weeks.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "week fractions are reported as floating point"
    )]
    pub fn weeks(&self) -> f64 {
        self.duration().num_seconds() as f64 / SECONDS_PER_WEEK
    }

    /// Splits the period into consecutive buckets of `width`.
    ///
    /// The final bucket is truncated at the period end.
    #[must_use]
    pub fn buckets(&self, width: TimeDelta) -> Vec<Self> {
        let mut buckets = Vec::new();
        if width <= TimeDelta::zero() {
            return buckets;
        }
        let mut start = self.start;
        while start < self.end {
            let end = start
                .checked_add_signed(width)
                .map_or(self.end, |candidate| candidate.min(self.end));
            buckets.push(Self { start, end });
            start = end;
        }
        buckets
    }
}

/// Returns whether `task` reached a done-category state other than the
/// workflow's cancel state.
#[must_use]
pub fn is_delivered(task: &Task, workflow: &Workflow) -> bool {
    workflow.is_in_category(task.status(), StateCategory::Done)
        && workflow.cancel_state() != Some(task.status())
}

/// Delivered tasks completed within `period`.
pub fn delivered_in<'a>(
    tasks: &'a [Task],
    workflow: &'a Workflow,
    period: Period,
) -> impl Iterator<Item = &'a Task> {
    tasks.iter().filter(move |task| {
        is_delivered(task, workflow) && task.completed_at().is_some_and(|at| period.contains(at))
    })
}

/// Sum of story-point estimates delivered within `period`.
#[must_use]
pub fn velocity(tasks: &[Task], workflow: &Workflow, period: Period) -> u64 {
    delivered_in(tasks, workflow, period)
        .filter_map(Task::estimate)
        .map(u64::from)
        .sum()
}

/// Delivered tasks per week within `period`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "throughput is a rate per fractional week"
)]
pub fn throughput(tasks: &[Task], workflow: &Workflow, period: Period) -> f64 {
    let weeks = period.weeks();
    if weeks <= 0.0 {
        return 0.0;
    }
    count_as_f64(delivered_in(tasks, workflow, period).count()) / weeks
}

/// Number of tasks currently in an in-progress-category state.
#[must_use]
pub fn wip(tasks: &[Task], workflow: &Workflow) -> usize {
    tasks
        .iter()
        .filter(|task| workflow.is_in_category(task.status(), StateCategory::InProgress))
        .count()
}

/// Mean and population standard deviation of a set of durations, in hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationStats {
    /// Number of samples.
    pub samples: usize,
    /// Mean duration in hours.
    pub mean_hours: f64,
    /// Population standard deviation in hours.
    pub std_dev_hours: f64,
}

impl DurationStats {
    /// Summarizes `durations`; all fields are zero for an empty input.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "mean and deviation are floating point statistics"
    )]
    pub fn from_durations(durations: &[TimeDelta]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }
        let hours: Vec<f64> = durations
            .iter()
            .map(|duration| duration.num_seconds() as f64 / SECONDS_PER_HOUR)
            .collect();
        let samples = count_as_f64(hours.len());
        let mean_hours = hours.iter().sum::<f64>() / samples;
        let variance = hours
            .iter()
            .map(|value| (value - mean_hours).powi(2))
            .sum::<f64>()
            / samples;
        Self {
            samples: hours.len(),
            mean_hours,
            std_dev_hours: variance.sqrt(),
        }
    }
}

/// Cycle and lead time statistics for tasks delivered in one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendBucket {
    /// Bucket window.
    pub period: Period,
    /// Cycle time statistics.
    pub cycle_time: DurationStats,
    /// Lead time statistics.
    pub lead_time: DurationStats,
}

/// Cycle and lead time trend across `period`, one entry per `bucket` width.
#[must_use]
pub fn trends(
    tasks: &[Task],
    workflow: &Workflow,
    period: Period,
    bucket: TimeDelta,
) -> Vec<TrendBucket> {
    period
        .buckets(bucket)
        .into_iter()
        .map(|window| {
            let (cycle, lead): (Vec<TimeDelta>, Vec<TimeDelta>) =
                delivered_in(tasks, workflow, window)
                    .filter_map(Task::completion)
                    .map(|completion| (completion.cycle_time, completion.lead_time))
                    .unzip();
            TrendBucket {
                period: window,
                cycle_time: DurationStats::from_durations(&cycle),
                lead_time: DurationStats::from_durations(&lead),
            }
        })
        .collect()
}

/// Mean of `durations`, or `None` when empty.
#[must_use]
pub fn mean_duration(durations: &[TimeDelta]) -> Option<TimeDelta> {
    let count = i32::try_from(durations.len()).ok().filter(|count| *count > 0)?;
    let total = durations
        .iter()
        .fold(TimeDelta::zero(), |sum, duration| sum + *duration);
    Some(total / count)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "task counts stay far below 2^52"
)]
pub(crate) fn count_as_f64(count: usize) -> f64 {
    count as f64
}
