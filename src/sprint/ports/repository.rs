//! Repository port for sprint persistence.

use crate::sprint::domain::{Sprint, SprintVersion};
use crate::task::domain::SprintId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sprint repository operations.
pub type SprintRepositoryResult<T> = Result<T, SprintRepositoryError>;

/// Sprint persistence contract.
#[async_trait]
pub trait SprintRepository: Send + Sync {
    /// Stores a new sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::DuplicateSprint`] when the identifier
    /// already exists.
    async fn store(&self, sprint: &Sprint) -> SprintRepositoryResult<()>;

    /// Persists changes to an existing sprint when the stored version still
    /// matches `expected`, returning the sprint with its bumped version.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::NotFound`] when the sprint does not
    /// exist and [`SprintRepositoryError::Conflict`] when another writer
    /// updated it first.
    async fn update_with_version(
        &self,
        sprint: &Sprint,
        expected: SprintVersion,
    ) -> SprintRepositoryResult<Sprint>;

    /// Finds a sprint by identifier.
    ///
    /// Returns `None` when the sprint does not exist.
    async fn find_by_id(&self, id: SprintId) -> SprintRepositoryResult<Option<Sprint>>;

    /// Returns every sprint ordered by start date.
    async fn list_all(&self) -> SprintRepositoryResult<Vec<Sprint>>;
}

/// Optimistic concurrency failure on a sprint update.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("sprint {sprint_id} version conflict: expected {expected_version}, found {actual_version}")]
pub struct SprintConflictError {
    /// Sprint whose update was rejected.
    pub sprint_id: SprintId,
    /// Version the writer read.
    pub expected_version: SprintVersion,
    /// Version currently stored.
    pub actual_version: SprintVersion,
}

/// Errors returned by sprint repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SprintRepositoryError {
    /// A sprint with the same identifier already exists.
    #[error("duplicate sprint identifier: {0}")]
    DuplicateSprint(SprintId),

    /// The sprint was not found.
    #[error("sprint not found: {0}")]
    NotFound(SprintId),

    /// The stored version moved on since the sprint was read.
    #[error(transparent)]
    Conflict(#[from] SprintConflictError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SprintRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
