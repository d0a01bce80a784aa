//! Dependency integration tests across the graph, lifecycle and engine.

use crate::in_memory::helpers::{Stack, request, stack};
use gantry::graph::services::{AddDependencyRequest, GraphServiceError};
use gantry::task::{
    domain::{Minutes, TaskId},
    ports::{TaskStore, TaskStoreError},
    services::TaskServiceError,
};
use rstest::rstest;

async fn timed(stack: &Stack, title: &str, hours: i64) -> TaskId {
    stack
        .task(request(title).with_time_estimate(Minutes::from_hours(hours)))
        .await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_edge_leaves_the_graph_untouched(stack: Stack) {
    let t1 = timed(&stack, "T1", 1).await;
    let t2 = timed(&stack, "T2", 1).await;
    stack
        .graph
        .add_dependency(AddDependencyRequest::new(t2, t1))
        .await
        .expect("T2 may depend on T1");
    let before = stack.store.all_edges().await.expect("edges load");

    let err = stack
        .graph
        .add_dependency(AddDependencyRequest::new(t1, t2))
        .await
        .expect_err("T1 depending on T2 closes a cycle");

    let GraphServiceError::CircularDependency(cycle) = err else {
        panic!("expected a circular dependency, got {err:?}");
    };
    assert_eq!(cycle.cycle, vec![t1, t2, t1]);
    assert_eq!(stack.store.all_edges().await.expect("edges load"), before);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn longer_branch_carries_the_project(stack: Stack) {
    let design = timed(&stack, "Design", 3).await;
    let backend = timed(&stack, "Backend", 4).await;
    let docs = timed(&stack, "Docs", 2).await;
    let release = timed(&stack, "Release", 1).await;
    for (task, depends_on) in [
        (backend, design),
        (docs, design),
        (release, backend),
        (release, docs),
    ] {
        stack
            .graph
            .add_dependency(AddDependencyRequest::new(task, depends_on))
            .await
            .expect("acyclic edge");
    }

    let path = stack
        .graph
        .compute_project_critical_path()
        .await
        .expect("critical path computes");

    assert_eq!(path.path, vec![design, backend, release]);
    assert_eq!(path.project_duration, Minutes::from_hours(8));
    assert_eq!(path.slack.get(&docs), Some(&Minutes::from_hours(2)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn referenced_task_cannot_be_deleted(stack: Stack) {
    let upstream = timed(&stack, "Upstream", 1).await;
    let downstream = timed(&stack, "Downstream", 1).await;
    stack
        .graph
        .add_dependency(AddDependencyRequest::new(downstream, upstream))
        .await
        .expect("acyclic edge");

    let refused = stack.tasks.delete_task(upstream).await;
    assert!(matches!(
        refused,
        Err(TaskServiceError::Store(TaskStoreError::Referenced { ref dependents, .. }))
            if dependents == &vec![downstream]
    ));

    stack
        .graph
        .remove_dependency(downstream, upstream)
        .await
        .expect("edge removal runs");
    stack
        .tasks
        .delete_task(upstream)
        .await
        .expect("unreferenced task deletes");
    assert!(
        stack
            .tasks
            .find_by_id(upstream)
            .await
            .expect("lookup runs")
            .is_none()
    );
}
