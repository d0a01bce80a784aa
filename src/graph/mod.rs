//! Task dependency graph and critical-path analysis.
//!
//! Edges are stored through the task store port; this module provides the
//! acyclicity guard, cycle diagnosis and the Critical Path Method.
//!
//! - Domain types in [`domain`]
//! - Orchestration services in [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
