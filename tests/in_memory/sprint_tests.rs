//! Sprint planning integration tests from commitment to velocity.

use crate::in_memory::helpers::{Stack, actor, request, stack};
use chrono::TimeDelta;
use gantry::metrics::domain::{MetricsScope, Period};
use gantry::sprint::{
    domain::SprintStatus,
    services::{CreateSprintRequest, SprintServiceError},
};
use mockable::{Clock, DefaultClock};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sprint_runs_from_commitment_to_report(stack: Stack) {
    let today = DefaultClock.utc().date_naive();
    let sprint = stack
        .planner
        .create_sprint(CreateSprintRequest::new(
            "Sprint 12",
            today,
            today + TimeDelta::days(13),
            20,
        ))
        .await
        .expect("sprint should be created");
    let committed = stack.task(request("Committed").with_estimate(13)).await;
    let shipped = stack.task(request("Shipped").with_estimate(5)).await;
    let added = stack.task(request("Added").with_estimate(2)).await;
    for task in [committed, shipped] {
        stack
            .planner
            .assign_task(sprint.id(), task)
            .await
            .expect("assignment fits");
    }
    stack
        .planner
        .start_sprint(sprint.id())
        .await
        .expect("sprint should start");
    stack
        .planner
        .assign_task(sprint.id(), added)
        .await
        .expect("scope change fits");
    stack
        .walk(shipped, &["todo", "in_progress", "done"])
        .await;
    stack
        .engine
        .cancel_task(added, actor("lead"))
        .await
        .expect("cancel should succeed");
    stack
        .planner
        .record_burndown(sprint.id())
        .await
        .expect("burndown should record");

    let report = stack
        .planner
        .close_sprint(sprint.id())
        .await
        .expect("sprint should close");

    assert_eq!(report.sprint.status(), SprintStatus::Completed);
    assert_eq!(report.sprint.committed_points(), 18);
    assert_eq!(report.sprint.added_points(), 2);
    assert_eq!(report.sprint.completed_points(), 5);
    assert_eq!(report.sprint.carryover_points(), 13);
    assert_eq!(report.carried_over, vec![committed]);

    let now = DefaultClock.utc();
    let metrics = stack
        .metrics
        .get_metrics(
            MetricsScope::All,
            Period::new(now - TimeDelta::days(1), now + TimeDelta::days(1))
                .expect("valid period"),
        )
        .await
        .expect("metrics should compute");
    assert_eq!(metrics.velocity, 5);
    assert_eq!(metrics.delivered, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_sprint_refuses_new_work(stack: Stack) {
    let today = DefaultClock.utc().date_naive();
    let sprint = stack
        .planner
        .create_sprint(CreateSprintRequest::new("Short", today, today, 5))
        .await
        .expect("sprint should be created");
    stack
        .planner
        .start_sprint(sprint.id())
        .await
        .expect("sprint should start");
    stack
        .planner
        .close_sprint(sprint.id())
        .await
        .expect("sprint should close");
    let late = stack.task(request("Too late").with_estimate(1)).await;

    let err = stack
        .planner
        .assign_task(sprint.id(), late)
        .await
        .expect_err("completed sprint refuses work");

    assert!(matches!(err, SprintServiceError::InvalidState(_)));
}
