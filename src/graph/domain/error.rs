//! Error types for dependency graph operations.

use crate::task::domain::TaskId;
use thiserror::Error;

/// The edge set contains, or would contain, a cycle.
///
/// `cycle` is a closed path: its first and last entries are the same task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("circular dependency: {}", render_cycle(.cycle))]
pub struct CircularDependencyError {
    /// Tasks along the cycle, closed on the starting task.
    pub cycle: Vec<TaskId>,
}

fn render_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
