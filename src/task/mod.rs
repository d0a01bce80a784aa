//! Task records and their storage.
//!
//! Tasks form a parent/child hierarchy of bounded depth and are persisted
//! through [`ports::TaskStore`], which also holds the dependency edges and
//! the transition log so related writes can share one atomic boundary. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod tests;
