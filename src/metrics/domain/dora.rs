//! DORA delivery metrics over an externally supplied deployment stream.

use super::aggregate::{Period, count_as_f64, mean_duration};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One production deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    /// When the deployment reached production.
    pub deployed_at: DateTime<Utc>,
    /// Whether the deployment caused a failure in production.
    pub failed: bool,
    /// When service was restored after a failed deployment.
    pub restored_at: Option<DateTime<Utc>>,
    /// Oldest commit time of the changes shipped, when known.
    pub first_commit_at: Option<DateTime<Utc>>,
}

impl DeploymentEvent {
    /// Creates a successful deployment event.
    #[must_use]
    pub const fn succeeded(deployed_at: DateTime<Utc>) -> Self {
        Self {
            deployed_at,
            failed: false,
            restored_at: None,
            first_commit_at: None,
        }
    }

    /// Creates a failed deployment event.
    #[must_use]
    pub const fn failure(deployed_at: DateTime<Utc>, restored_at: Option<DateTime<Utc>>) -> Self {
        Self {
            deployed_at,
            failed: true,
            restored_at,
            first_commit_at: None,
        }
    }

    /// Sets the oldest commit time of the shipped changes.
    #[must_use]
    pub const fn with_first_commit(mut self, at: DateTime<Utc>) -> Self {
        self.first_commit_at = Some(at);
        self
    }
}

/// The four DORA key metrics for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoraMetrics {
    /// Number of deployments in the period.
    pub deployments: usize,
    /// Deployments per week.
    pub deployment_frequency: f64,
    /// Share of deployments that failed, between 0 and 1.
    pub change_failure_rate: f64,
    /// Mean time from a failed deployment to restoration.
    pub mean_time_to_restore: Option<TimeDelta>,
    /// Mean time from first commit to deployment.
    pub lead_time_for_changes: Option<TimeDelta>,
}

/// Aggregates the deployments that fall inside `period`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "frequency and failure rate are floating point ratios"
)]
pub fn dora_metrics(events: &[DeploymentEvent], period: Period) -> DoraMetrics {
    let in_period: Vec<&DeploymentEvent> = events
        .iter()
        .filter(|event| period.contains(event.deployed_at))
        .collect();
    let deployments = in_period.len();
    let failures = in_period.iter().filter(|event| event.failed).count();

    let weeks = period.weeks();
    let deployment_frequency = if weeks > 0.0 {
        count_as_f64(deployments) / weeks
    } else {
        0.0
    };
    let change_failure_rate = if deployments == 0 {
        0.0
    } else {
        count_as_f64(failures) / count_as_f64(deployments)
    };

    let restore_times: Vec<TimeDelta> = in_period
        .iter()
        .filter(|event| event.failed)
        .filter_map(|event| event.restored_at.map(|restored| restored - event.deployed_at))
        .collect();
    let change_lead_times: Vec<TimeDelta> = in_period
        .iter()
        .filter_map(|event| event.first_commit_at.map(|commit| event.deployed_at - commit))
        .collect();

    DoraMetrics {
        deployments,
        deployment_frequency,
        change_failure_rate,
        mean_time_to_restore: mean_duration(&restore_times),
        lead_time_for_changes: mean_duration(&change_lead_times),
    }
}
