//! Shared test helpers for in-memory integration tests.

use gantry::config::EngineConfig;
use gantry::graph::services::DependencyService;
use gantry::metrics::services::MetricsCalculator;
use gantry::sprint::{adapters::memory::InMemorySprintRepository, services::SprintPlanner};
use gantry::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{ActorId, TaskId, TaskType},
    services::{CreateTaskRequest, TaskLifecycleService},
};
use gantry::workflow::{
    adapters::memory::RecordingDispatcher,
    domain::{Actor, StateId, Workflow},
    services::{TransitionRequest, WorkflowEngine},
};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

/// Every service wired over one in-memory store.
pub struct Stack {
    pub store: Arc<InMemoryTaskStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub tasks: TaskLifecycleService<InMemoryTaskStore, DefaultClock>,
    pub engine: WorkflowEngine<InMemoryTaskStore, RecordingDispatcher, DefaultClock>,
    pub graph: DependencyService<InMemoryTaskStore, DefaultClock>,
    pub planner: SprintPlanner<InMemoryTaskStore, InMemorySprintRepository, DefaultClock>,
    pub metrics: MetricsCalculator<InMemoryTaskStore, DefaultClock>,
}

impl Stack {
    /// Wires the services around `workflow` and `config`.
    #[must_use]
    pub fn new(workflow: Workflow, config: EngineConfig) -> Self {
        Self::with_dispatcher(workflow, config, RecordingDispatcher::new())
    }

    /// Wires the services with a custom dispatcher.
    #[must_use]
    pub fn with_dispatcher(
        workflow: Workflow,
        config: EngineConfig,
        dispatcher: RecordingDispatcher,
    ) -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(DefaultClock);
        let flow = Arc::new(workflow);
        let automation = Arc::new(dispatcher);
        Self {
            tasks: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&flow),
                config.clone(),
            ),
            engine: WorkflowEngine::new(
                Arc::clone(&store),
                Arc::clone(&automation),
                Arc::clone(&clock),
                Arc::clone(&flow),
            ),
            graph: DependencyService::new(Arc::clone(&store), Arc::clone(&clock), config.clone()),
            planner: SprintPlanner::new(
                Arc::clone(&store),
                Arc::new(InMemorySprintRepository::new()),
                Arc::clone(&clock),
                Arc::clone(&flow),
                config.clone(),
            ),
            metrics: MetricsCalculator::new(Arc::clone(&store), clock, flow, config),
            dispatcher: automation,
            store,
        }
    }

    /// Creates a task and returns its identifier.
    ///
    /// # Panics
    ///
    /// Panics when creation fails.
    pub async fn task(&self, request: CreateTaskRequest) -> TaskId {
        self.tasks
            .create_task(request)
            .await
            .expect("task creation should succeed")
            .id()
    }

    /// Moves a task through `path` as the `dev` actor.
    ///
    /// # Panics
    ///
    /// Panics when any transition fails.
    pub async fn walk(&self, task_id: TaskId, path: &[&str]) {
        for status in path {
            self.engine
                .transition_task(task_id, TransitionRequest::new(state(status), actor("dev")))
                .await
                .expect("transition should succeed");
        }
    }
}

/// Provides the standard workflow stack with default configuration.
#[fixture]
pub fn stack() -> Stack {
    Stack::new(Workflow::standard(), EngineConfig::default())
}

/// Builds a state identifier.
///
/// # Panics
///
/// Panics on an empty name.
#[must_use]
pub fn state(name: &str) -> StateId {
    StateId::new(name).expect("valid state id")
}

/// Builds an actor without roles.
///
/// # Panics
///
/// Panics on an empty name.
#[must_use]
pub fn actor(name: &str) -> Actor {
    Actor::new(ActorId::new(name).expect("valid actor id"))
}

/// Builds a task creation request reported by `reporter`.
#[must_use]
pub fn request(title: &str) -> CreateTaskRequest {
    CreateTaskRequest::new(
        TaskType::Task,
        title,
        ActorId::new("reporter").expect("valid actor id"),
    )
}
