//! Port contracts for task storage.
//!
//! Ports define infrastructure-agnostic interfaces used by the services of
//! every bounded context.

pub mod store;

pub use store::{
    ConflictError, EntityKind, NotFoundError, TaskQuery, TaskStore, TaskStoreError,
    TaskStoreResult,
};
