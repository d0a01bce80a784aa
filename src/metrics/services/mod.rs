//! Application services for analytics.

mod calculator;

pub use calculator::{MetricsCalculator, MetricsServiceError, MetricsServiceResult};
