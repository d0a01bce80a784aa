//! In-memory sprint repository for tests and embedding.

use crate::sprint::{
    domain::{Sprint, SprintVersion},
    ports::{SprintConflictError, SprintRepository, SprintRepositoryError, SprintRepositoryResult},
};
use crate::task::domain::SprintId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory sprint repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySprintRepository {
    sprints: Arc<RwLock<HashMap<SprintId, Sprint>>>,
}

impl InMemorySprintRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> SprintRepositoryResult<RwLockReadGuard<'_, HashMap<SprintId, Sprint>>> {
        self.sprints.read().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> SprintRepositoryResult<RwLockWriteGuard<'_, HashMap<SprintId, Sprint>>> {
        self.sprints.write().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl SprintRepository for InMemorySprintRepository {
    async fn store(&self, sprint: &Sprint) -> SprintRepositoryResult<()> {
        let mut sprints = self.write()?;
        if sprints.contains_key(&sprint.id()) {
            return Err(SprintRepositoryError::DuplicateSprint(sprint.id()));
        }
        sprints.insert(sprint.id(), sprint.clone());
        Ok(())
    }

    async fn update_with_version(
        &self,
        sprint: &Sprint,
        expected: SprintVersion,
    ) -> SprintRepositoryResult<Sprint> {
        let mut sprints = self.write()?;
        let slot = sprints
            .get_mut(&sprint.id())
            .ok_or(SprintRepositoryError::NotFound(sprint.id()))?;
        if slot.version() != expected {
            return Err(SprintConflictError {
                sprint_id: sprint.id(),
                expected_version: expected,
                actual_version: slot.version(),
            }
            .into());
        }
        let mut updated = sprint.clone();
        updated.set_version(expected.next());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn find_by_id(&self, id: SprintId) -> SprintRepositoryResult<Option<Sprint>> {
        let sprints = self.read()?;
        Ok(sprints.get(&id).cloned())
    }

    async fn list_all(&self) -> SprintRepositoryResult<Vec<Sprint>> {
        let sprints = self.read()?;
        let mut all: Vec<Sprint> = sprints.values().cloned().collect();
        all.sort_by_key(|sprint| (sprint.start_date(), sprint.created_at()));
        Ok(all)
    }
}
