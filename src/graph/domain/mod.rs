//! Domain model for task dependencies.
//!
//! The dependency edge set must stay acyclic at all times;
//! [`DependencyGraph::add_edge`] is the guard that protects that invariant.

mod critical_path;
mod dependency;
mod error;
mod graph;

pub use critical_path::{CriticalPath, TaskSchedule, compute_critical_path};
pub use dependency::{DependencyType, TaskDependency};
pub use error::CircularDependencyError;
pub use graph::DependencyGraph;
