//! Persistence tests for the `PostgreSQL` task store.

use super::helpers::{PgStack, pg_stack};
use gantry::graph::services::{AddDependencyRequest, GraphServiceError};
use gantry::task::{
    domain::{ActorId, Minutes, Priority, TaskChanges, TaskId, TaskType},
    ports::{TaskQuery, TaskStore, TaskStoreError},
    services::{CreateTaskRequest, TaskServiceError, UpdateTaskRequest},
};
use gantry::workflow::{
    domain::{Actor, StateId},
    services::TransitionRequest,
};
use rstest::rstest;

fn request(title: &str) -> CreateTaskRequest {
    CreateTaskRequest::new(
        TaskType::Task,
        title,
        ActorId::new("reporter").expect("valid actor id"),
    )
}

fn retitle(title: &str) -> TaskChanges {
    TaskChanges {
        title: Some(title.to_owned()),
        ..TaskChanges::default()
    }
}

async fn create(stack: &PgStack, title: &str) -> TaskId {
    stack
        .tasks
        .create_task(request(title).with_time_estimate(Minutes::from_hours(2)))
        .await
        .expect("task creation should succeed")
        .id()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_task_round_trips(pg_stack: Option<PgStack>) {
    let Some(stack) = pg_stack else { return };
    let created = stack
        .tasks
        .create_task(
            request("Persist me")
                .with_description("stored in postgres")
                .with_priority(Priority::High)
                .with_estimate(3)
                .with_labels(["backend", "db"]),
        )
        .await
        .expect("task creation should succeed");

    let loaded = stack
        .store
        .get(created.id())
        .await
        .expect("lookup should succeed")
        .expect("task should exist");

    assert_eq!(loaded.title(), "Persist me");
    assert_eq!(loaded.description(), Some("stored in postgres"));
    assert_eq!(loaded.priority(), Priority::High);
    assert_eq!(loaded.estimate(), Some(3));
    assert_eq!(loaded.labels(), created.labels());
    assert_eq!(loaded.status(), created.status());
    assert_eq!(loaded.version(), created.version());
    let log = stack
        .store
        .transitions(created.id())
        .await
        .expect("log should load");
    assert_eq!(log.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_update_is_a_conflict(pg_stack: Option<PgStack>) {
    let Some(stack) = pg_stack else { return };
    let task_id = create(&stack, "Contended").await;
    let original = stack
        .tasks
        .find_by_id(task_id)
        .await
        .expect("lookup should succeed")
        .expect("task should exist");
    stack
        .tasks
        .update_task(UpdateTaskRequest::new(task_id, retitle("First writer")))
        .await
        .expect("first update should succeed");

    let err = stack
        .tasks
        .update_task(
            UpdateTaskRequest::new(task_id, retitle("Second writer"))
                .with_expected_version(original.version()),
        )
        .await
        .expect_err("stale version should conflict");

    assert!(matches!(err, TaskServiceError::Conflict(_)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transitions_are_logged_in_order(pg_stack: Option<PgStack>) {
    let Some(stack) = pg_stack else { return };
    let task_id = create(&stack, "Walk").await;
    let actor = Actor::new(ActorId::new("dev").expect("valid actor id"));
    for status in ["todo", "in_progress", "done"] {
        stack
            .engine
            .transition_task(
                task_id,
                TransitionRequest::new(
                    StateId::new(status).expect("valid state id"),
                    actor.clone(),
                ),
            )
            .await
            .expect("transition should succeed");
    }

    let history = stack.engine.history(task_id).await.expect("history loads");
    let statuses: Vec<&str> = history
        .iter()
        .map(|record| record.to_status().as_str())
        .collect();
    assert_eq!(statuses, vec!["backlog", "todo", "in_progress", "done"]);

    let done = stack
        .store
        .list_tasks(&TaskQuery::default())
        .await
        .expect("listing should succeed");
    assert!(done.iter().all(|task| task.completion().is_some()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cycle_is_rejected_inside_the_database(pg_stack: Option<PgStack>) {
    let Some(stack) = pg_stack else { return };
    let first = create(&stack, "First").await;
    let second = create(&stack, "Second").await;
    stack
        .graph
        .add_dependency(AddDependencyRequest::new(second, first))
        .await
        .expect("acyclic edge");

    let err = stack
        .graph
        .add_dependency(AddDependencyRequest::new(first, second))
        .await
        .expect_err("closing edge should be rejected");

    let GraphServiceError::CircularDependency(cycle) = err else {
        panic!("expected a circular dependency, got {err:?}");
    };
    assert_eq!(cycle.cycle, vec![first, second, first]);
    assert_eq!(stack.store.all_edges().await.expect("edges load").len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn referenced_task_survives_delete(pg_stack: Option<PgStack>) {
    let Some(stack) = pg_stack else { return };
    let upstream = create(&stack, "Upstream").await;
    let downstream = create(&stack, "Downstream").await;
    stack
        .graph
        .add_dependency(AddDependencyRequest::new(downstream, upstream))
        .await
        .expect("acyclic edge");

    let refused = stack.tasks.delete_task(upstream).await;

    assert!(matches!(
        refused,
        Err(TaskServiceError::Store(TaskStoreError::Referenced { .. }))
    ));
    assert!(
        stack
            .store
            .get(upstream)
            .await
            .expect("lookup should succeed")
            .is_some()
    );
}
