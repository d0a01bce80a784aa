//! Fixtures shared by the unit tests of every context.

use crate::config::EngineConfig;
use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{ActorId, NewTaskData, Priority, Task, TaskType},
    services::{CreateTaskRequest, TaskLifecycleService},
};
use crate::workflow::domain::{Actor, StateId, Workflow};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use std::sync::{Arc, Mutex, PoisonError};

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub(crate) fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub(crate) fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Monday 2026-01-05 09:00 UTC.
pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0)
        .single()
        .expect("valid epoch")
}

pub(crate) fn actor_id(name: &str) -> ActorId {
    ActorId::new(name).expect("valid actor id")
}

pub(crate) fn actor(name: &str) -> Actor {
    Actor::new(actor_id(name))
}

pub(crate) fn state(name: &str) -> StateId {
    StateId::new(name).expect("valid state id")
}

/// Builds an unsaved story in `status`.
pub(crate) fn story(title: &str, status: &str, clock: &impl Clock) -> Task {
    Task::new(
        NewTaskData {
            task_type: TaskType::Story,
            title: title.to_owned(),
            description: None,
            status: state(status),
            priority: Priority::Medium,
            parent_id: None,
            estimate: None,
            time_estimate: None,
            assignee: None,
            labels: Vec::new(),
            sprint_id: None,
        },
        clock,
    )
    .expect("valid story")
}

pub(crate) fn create_request(title: &str) -> CreateTaskRequest {
    CreateTaskRequest::new(TaskType::Task, title, actor_id("reporter"))
}

pub(crate) type TestLifecycle = TaskLifecycleService<InMemoryTaskStore, ManualClock>;

#[fixture]
pub(crate) fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(epoch()))
}

#[fixture]
pub(crate) fn store() -> Arc<InMemoryTaskStore> {
    Arc::new(InMemoryTaskStore::new())
}

#[fixture]
pub(crate) fn workflow() -> Arc<Workflow> {
    Arc::new(Workflow::standard())
}

#[fixture]
pub(crate) fn lifecycle(
    store: Arc<InMemoryTaskStore>,
    clock: Arc<ManualClock>,
    workflow: Arc<Workflow>,
) -> TestLifecycle {
    TaskLifecycleService::new(store, clock, workflow, EngineConfig::default())
}
