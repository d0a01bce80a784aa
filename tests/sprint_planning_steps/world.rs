//! Shared world state for sprint planning BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use gantry::config::EngineConfig;
use gantry::sprint::{
    adapters::memory::InMemorySprintRepository,
    domain::Sprint,
    services::{SprintPlanner, SprintReport, SprintServiceResult},
};
use gantry::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{SprintId, TaskId},
    services::TaskLifecycleService,
};
use gantry::workflow::{
    adapters::memory::RecordingDispatcher, domain::Workflow, services::WorkflowEngine,
};
use mockable::DefaultClock;
use rstest::fixture;

/// Scenario world for sprint planning behaviour tests.
pub struct SprintWorld {
    pub tasks: TaskLifecycleService<InMemoryTaskStore, DefaultClock>,
    pub engine: WorkflowEngine<InMemoryTaskStore, RecordingDispatcher, DefaultClock>,
    pub planner: SprintPlanner<InMemoryTaskStore, InMemorySprintRepository, DefaultClock>,
    pub named: HashMap<String, TaskId>,
    pub sprint_id: Option<SprintId>,
    pub last_assignment: Option<SprintServiceResult<Sprint>>,
    pub last_report: Option<SprintReport>,
}

impl SprintWorld {
    /// Creates a world with no sprint.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(DefaultClock);
        let workflow = Arc::new(Workflow::standard());
        let config = EngineConfig::default();
        Self {
            tasks: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&workflow),
                config.clone(),
            ),
            engine: WorkflowEngine::new(
                Arc::clone(&store),
                Arc::new(RecordingDispatcher::new()),
                Arc::clone(&clock),
                Arc::clone(&workflow),
            ),
            planner: SprintPlanner::new(
                store,
                Arc::new(InMemorySprintRepository::new()),
                clock,
                workflow,
                config,
            ),
            named: HashMap::new(),
            sprint_id: None,
            last_assignment: None,
            last_report: None,
        }
    }

    /// Returns the sprint under test.
    ///
    /// # Errors
    ///
    /// Fails before a sprint has been created.
    pub fn sprint_id(&self) -> Result<SprintId, eyre::Report> {
        self.sprint_id
            .ok_or_else(|| eyre::eyre!("missing sprint in scenario world"))
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

    /// Loads the sprint under test.
    ///
    /// # Errors
    ///
    /// Fails when the sprint cannot be loaded.
    pub fn sprint(&self) -> Result<Sprint, eyre::Report> {
        let sprint_id = self.sprint_id()?;
        run_async(self.planner.find_by_id(sprint_id))
            .map_err(|err| eyre::eyre!("load sprint: {err}"))?
            .ok_or_else(|| eyre::eyre!("sprint {sprint_id} disappeared"))
    }
}

impl Default for SprintWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SprintWorld {
    SprintWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
