//! In-memory task store for tests and embedded use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::graph::domain::{DependencyGraph, TaskDependency};
use crate::task::{
    domain::{Task, TaskId, TaskVersion},
    ports::{ConflictError, NotFoundError, TaskQuery, TaskStore, TaskStoreError, TaskStoreResult},
};
use crate::workflow::domain::StateTransition;

/// Thread-safe in-memory task store.
///
/// One lock guards tasks, edges and logs together, so every operation is
/// serializable with respect to every other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    transitions: HashMap<TaskId, Vec<StateTransition>>,
    graph: DependencyGraph,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskStoreResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state
            .read()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> TaskStoreResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state
            .write()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

impl InMemoryTaskState {
    /// Writes `task` at `expected.next()` when the stored version matches.
    fn replace_checked(&mut self, task: &Task, expected: TaskVersion) -> TaskStoreResult<Task> {
        let stored = self
            .tasks
            .get_mut(&task.id())
            .ok_or_else(|| NotFoundError::task(task.id()))?;
        if stored.version() != expected {
            return Err(ConflictError {
                task_id: task.id(),
                expected_version: expected,
                actual_version: stored.version(),
            }
            .into());
        }
        let mut updated = task.clone();
        updated.set_version(expected.next());
        *stored = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn create(&self, task: &Task, initial: &StateTransition) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        state
            .transitions
            .insert(task.id(), vec![initial.clone()]);
        state.graph.add_task(task.id());
        Ok(())
    }

    async fn update_with_version(
        &self,
        task: &Task,
        expected: TaskVersion,
    ) -> TaskStoreResult<Task> {
        self.write()?.replace_checked(task, expected)
    }

    async fn commit_transition(
        &self,
        task: &Task,
        expected: TaskVersion,
        record: &StateTransition,
    ) -> TaskStoreResult<Task> {
        let mut state = self.write()?;
        let updated = state.replace_checked(task, expected)?;
        state
            .transitions
            .entry(task.id())
            .or_default()
            .push(record.clone());
        Ok(updated)
    }

    async fn append_transition(&self, record: &StateTransition) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&record.task_id()) {
            return Err(NotFoundError::task(record.task_id()).into());
        }
        state
            .transitions
            .entry(record.task_id())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn transitions(&self, task_id: TaskId) -> TaskStoreResult<Vec<StateTransition>> {
        Ok(self
            .read()?
            .transitions
            .get(&task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_tasks(&self, query: &TaskQuery) -> TaskStoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    async fn list_edges(&self, task_id: TaskId) -> TaskStoreResult<Vec<TaskDependency>> {
        let state = self.read()?;
        Ok(state
            .graph
            .edges()
            .filter(|edge| edge.task_id() == task_id || edge.depends_on_id() == task_id)
            .copied()
            .collect())
    }

    async fn all_edges(&self) -> TaskStoreResult<Vec<TaskDependency>> {
        Ok(self.read()?.graph.edges().copied().collect())
    }

    async fn insert_dependency(&self, dependency: &TaskDependency) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        for id in [dependency.task_id(), dependency.depends_on_id()] {
            if !state.tasks.contains_key(&id) {
                return Err(NotFoundError::task(id).into());
            }
        }
        state.graph.add_edge(*dependency)?;
        Ok(())
    }

    async fn remove_dependency(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> TaskStoreResult<bool> {
        Ok(self
            .write()?
            .graph
            .remove_edge(task_id, depends_on_id)
            .is_some())
    }

    async fn delete(&self, id: TaskId) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&id) {
            return Err(NotFoundError::task(id).into());
        }
        let mut dependents: Vec<TaskId> = state
            .graph
            .successors(id)
            .map(TaskDependency::task_id)
            .chain(
                state
                    .tasks
                    .values()
                    .filter(|task| task.parent_id() == Some(id))
                    .map(Task::id),
            )
            .collect();
        dependents.sort_unstable();
        dependents.dedup();
        if !dependents.is_empty() {
            return Err(TaskStoreError::Referenced {
                task_id: id,
                dependents,
            });
        }
        state.tasks.remove(&id);
        state.transitions.remove(&id);
        state.graph.remove_task(id);
        Ok(())
    }
}
