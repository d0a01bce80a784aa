//! Port contracts for sprint persistence.

mod repository;

pub use repository::{
    SprintConflictError, SprintRepository, SprintRepositoryError, SprintRepositoryResult,
};
