//! Pure metric computations.
//!
//! [`timeline`] folds a single task's transition log; [`aggregate`] and
//! [`dora`] summarize many tasks or deployments over a [`Period`].

pub mod aggregate;
pub mod dora;
mod summary;
pub mod timeline;

pub use aggregate::{
    DurationStats, Period, PeriodError, TrendBucket, is_delivered, throughput, trends, velocity,
    wip,
};
pub use dora::{DeploymentEvent, DoraMetrics, dora_metrics};
pub use summary::{MetricsScope, MetricsSummary, TaskMetrics};
