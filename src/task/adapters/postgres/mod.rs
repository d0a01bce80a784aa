//! `PostgreSQL` adapter for task, dependency and transition persistence.
//!
//! The SQL that creates the tables lives under `migrations/` at the crate
//! root.

mod models;
mod schema;
mod store;

pub use store::{PostgresTaskStore, TaskPgPool};
