//! Shared world state for dependency graph BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use gantry::config::EngineConfig;
use gantry::graph::{
    domain::{CriticalPath, TaskDependency},
    services::{DependencyService, GraphServiceResult},
};
use gantry::task::{
    adapters::memory::InMemoryTaskStore, domain::TaskId, services::TaskLifecycleService,
};
use gantry::workflow::domain::Workflow;
use mockable::DefaultClock;
use rstest::fixture;

/// Scenario world for dependency graph behaviour tests.
pub struct DependencyWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub tasks: TaskLifecycleService<InMemoryTaskStore, DefaultClock>,
    pub graph: DependencyService<InMemoryTaskStore, DefaultClock>,
    pub named: HashMap<String, TaskId>,
    pub last_add: Option<GraphServiceResult<TaskDependency>>,
    pub last_path: Option<Arc<CriticalPath>>,
}

impl DependencyWorld {
    /// Creates a world over an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(DefaultClock);
        let config = EngineConfig::default();
        Self {
            tasks: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::new(Workflow::standard()),
                config.clone(),
            ),
            graph: DependencyService::new(Arc::clone(&store), clock, config),
            store,
            named: HashMap::new(),
            last_add: None,
            last_path: None,
        }
    }

    /// Resolves a task created earlier in the scenario.
    ///
    /// # Errors
    ///
    /// Fails when no task carries `title`.
    pub fn id_of(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.named
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task named {title} in scenario world"))
    }

    /// Resolves a comma-separated list of task titles.
    ///
    /// # Errors
    ///
    /// Fails when any title is unknown.
    pub fn ids_of(&self, titles: &str) -> Result<Vec<TaskId>, eyre::Report> {
        titles.split(',').map(|title| self.id_of(title.trim())).collect()
    }
}

impl Default for DependencyWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DependencyWorld {
    DependencyWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
