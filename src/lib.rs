//! Gantry: task tracking engine with workflows, dependencies and delivery
//! analytics.
//!
//! The crate manages tasks through configurable workflows, keeps a
//! dependency graph free of cycles, computes critical paths, plans sprints
//! and derives cycle time, lead time and team-level metrics from an
//! append-only transition log.
//!
//! # Architecture
//!
//! Gantry follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`task`]: Task records, the task store and field-level lifecycle
//! - [`workflow`]: Workflow definitions and the transition engine
//! - [`graph`]: Dependency edges, cycle detection and the critical path
//! - [`sprint`]: Sprint capacity, burndown and risk
//! - [`metrics`]: Time-in-state, cycle and lead time, DORA metrics
//! - [`config`]: Engine thresholds

pub mod config;
pub mod graph;
pub mod metrics;
pub mod sprint;
pub mod task;
pub mod workflow;
