//! Sprint risk scoring.

use super::Sprint;
use crate::config::EngineConfig;
use crate::task::domain::TaskId;
use serde::Serialize;

/// Overall sprint risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No risk factor raised.
    Low,
    /// One risk factor raised.
    Medium,
    /// Two or more risk factors raised.
    High,
}

/// A raised risk factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "factor", rename_all = "snake_case")]
pub enum RiskFactor {
    /// Too many tasks sit in blocking states.
    BlockedTasks {
        /// Blocked task count.
        count: usize,
        /// Configured threshold.
        threshold: usize,
    },
    /// Remaining work is above the ideal burndown line.
    BurndownDeviation {
        /// Relative deviation of the latest sample.
        deviation: f64,
        /// Configured threshold.
        threshold: f64,
    },
    /// Critical-path tasks have passed their latest start or finish.
    CriticalTasksBehind {
        /// Late tasks.
        tasks: Vec<TaskId>,
    },
}

/// Observations fed into [`assess_risk`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskInputs {
    /// Sprint tasks currently in blocking states.
    pub blocked_tasks: usize,
    /// Critical-path tasks behind schedule.
    pub critical_tasks_behind: Vec<TaskId>,
}

/// Risk assessment of one sprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintRisk {
    /// Overall level.
    pub level: RiskLevel,
    /// Factors that contributed to the level.
    pub factors: Vec<RiskFactor>,
}

/// Scores `sprint` against the configured thresholds.
///
/// Each raised factor adds one level: none is low, one is medium, two or
/// more is high.
#[must_use]
pub fn assess_risk(sprint: &Sprint, inputs: RiskInputs, config: &EngineConfig) -> SprintRisk {
    let mut factors = Vec::new();

    if inputs.blocked_tasks >= config.blocked_task_risk_threshold {
        factors.push(RiskFactor::BlockedTasks {
            count: inputs.blocked_tasks,
            threshold: config.blocked_task_risk_threshold,
        });
    }

    if let Some(latest) = sprint.latest_burndown() {
        let deviation = latest.deviation(sprint.committed_points());
        if deviation > config.burndown_deviation_threshold {
            factors.push(RiskFactor::BurndownDeviation {
                deviation,
                threshold: config.burndown_deviation_threshold,
            });
        }
    }

    if !inputs.critical_tasks_behind.is_empty() {
        factors.push(RiskFactor::CriticalTasksBehind {
            tasks: inputs.critical_tasks_behind,
        });
    }

    let level = match factors.len() {
        0 => RiskLevel::Low,
        1 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    SprintRisk { level, factors }
}
