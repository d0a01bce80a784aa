//! Shared world state for task workflow BDD scenarios.

use std::sync::Arc;

use gantry::config::EngineConfig;
use gantry::task::{
    adapters::memory::InMemoryTaskStore, domain::TaskId, services::TaskLifecycleService,
};
use gantry::workflow::{
    adapters::memory::RecordingDispatcher,
    domain::{Actor, Workflow},
    services::{TransitionOutcome, WorkflowEngine, WorkflowEngineResult},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Engine type used by the BDD world.
pub type TestEngine = WorkflowEngine<InMemoryTaskStore, RecordingDispatcher, DefaultClock>;

/// Scenario world for workflow behaviour tests.
pub struct TaskWorkflowWorld {
    pub tasks: TaskLifecycleService<InMemoryTaskStore, DefaultClock>,
    pub engine: TestEngine,
    pub task_id: Option<TaskId>,
    pub last_result: Option<WorkflowEngineResult<TransitionOutcome>>,
}

impl TaskWorkflowWorld {
    /// Creates a world running the standard workflow.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(DefaultClock);
        let workflow = Arc::new(Workflow::standard());
        Self {
            tasks: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&workflow),
                EngineConfig::default(),
            ),
            engine: WorkflowEngine::new(
                store,
                Arc::new(RecordingDispatcher::new()),
                clock,
                workflow,
            ),
            task_id: None,
            last_result: None,
        }
    }

    /// Returns the task under test.
    ///
    /// # Errors
    ///
    /// Fails before a task has been created.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        self.task_id
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for TaskWorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskWorkflowWorld {
    TaskWorkflowWorld::default()
}

/// Builds the acting developer.
///
/// # Errors
///
/// Fails when the actor identifier is rejected.
pub fn developer() -> Result<Actor, eyre::Report> {
    let id = gantry::task::domain::ActorId::new("dev")
        .map_err(|err| eyre::eyre!("invalid actor: {err}"))?;
    Ok(Actor::new(id))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
