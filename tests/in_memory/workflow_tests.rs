//! Workflow integration tests over a definition loaded from JSON.

use crate::in_memory::helpers::{Stack, actor, request, state};
use gantry::config::EngineConfig;
use gantry::task::domain::{ActorId, TaskField};
use gantry::workflow::{
    adapters::memory::RecordingDispatcher,
    domain::{
        ConditionViolation, PostAction, TransitionCondition, Workflow, WorkflowDefinition,
    },
    services::{TransitionRequest, WorkflowEngineError},
};
use rstest::{fixture, rstest};
use serde_json::json;

fn review_workflow() -> Workflow {
    let definition: WorkflowDefinition = serde_json::from_value(json!({
        "name": "code-review",
        "initial_state": "open",
        "cancel_state": "dropped",
        "states": [
            { "id": "open", "name": "Open", "category": "todo" },
            { "id": "coding", "name": "Coding", "category": "in_progress" },
            { "id": "review", "name": "Review", "category": "in_progress" },
            { "id": "merged", "name": "Merged", "category": "done" },
            { "id": "dropped", "name": "Dropped", "category": "done" }
        ],
        "transitions": [
            {
                "from": "open",
                "to": "coding",
                "conditions": [{ "type": "field_present", "field": "assignee" }],
                "post_actions": [{
                    "type": "notify",
                    "recipients": ["lead"],
                    "message": "work started"
                }]
            },
            { "from": "coding", "to": "review" },
            {
                "from": "review",
                "to": "merged",
                "required_approvals": 2,
                "allowed_roles": ["maintainer"],
                "post_actions": [{ "type": "webhook", "url": "https://ci.invalid/deploy" }]
            },
            { "from": "open", "to": "dropped" },
            { "from": "coding", "to": "dropped" },
            { "from": "review", "to": "dropped" }
        ]
    }))
    .expect("definition should deserialize");
    Workflow::new(definition).expect("definition should validate")
}

#[fixture]
fn review() -> Stack {
    Stack::new(review_workflow(), EngineConfig::default())
}

fn assignee() -> ActorId {
    ActorId::new("dev").expect("valid actor id")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unmet_guard_is_reported_and_nothing_changes(review: Stack) {
    let task_id = review.task(request("Unassigned change")).await;

    let err = review
        .engine
        .transition_task(task_id, TransitionRequest::new(state("coding"), actor("dev")))
        .await
        .expect_err("guard should fail");

    let WorkflowEngineError::Validation(rejection) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(rejection.contains(&ConditionViolation::ConditionFailed(
        TransitionCondition::FieldPresent {
            field: TaskField::Assignee
        }
    )));
    let history = review.engine.history(task_id).await.expect("history loads");
    assert_eq!(history.len(), 1);
    assert!(review.dispatcher.dispatched().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn post_actions_receive_the_committed_transition(review: Stack) {
    let task_id = review
        .task(request("Assigned change").with_assignee(assignee()))
        .await;

    review.walk(task_id, &["coding"]).await;

    let dispatched = review.dispatcher.dispatched();
    let (action, context) = dispatched.first().expect("one action dispatched");
    assert!(matches!(action, PostAction::Notify { message, .. } if message == "work started"));
    assert_eq!(context.task_id, task_id);
    assert_eq!(context.from_status, state("open"));
    assert_eq!(context.to_status, state("coding"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_violation_is_collected(review: Stack) {
    let task_id = review
        .task(request("Needs review").with_assignee(assignee()))
        .await;
    review.walk(task_id, &["coding", "review"]).await;

    let err = review
        .engine
        .transition_task(
            task_id,
            TransitionRequest::new(state("merged"), actor("dev")).with_approvals(1),
        )
        .await
        .expect_err("merge should be refused");

    let WorkflowEngineError::Validation(rejection) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(rejection.violated_conditions.len(), 2);
    assert!(rejection.contains(&ConditionViolation::ActorNotAllowed(assignee())));
    assert!(rejection.contains(&ConditionViolation::InsufficientApprovals {
        required: 2,
        actual: 1
    }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_merge_completes_and_locks_the_task(review: Stack) {
    let task_id = review
        .task(request("Ready change").with_assignee(assignee()))
        .await;
    review.walk(task_id, &["coding", "review"]).await;

    let outcome = review
        .engine
        .transition_task(
            task_id,
            TransitionRequest::new(state("merged"), actor("lead").with_roles(["maintainer"]))
                .with_approvals(2),
        )
        .await
        .expect("merge should succeed");

    assert!(outcome.task.completion().is_some());
    assert!(outcome.warnings.is_empty());
    let err = review
        .engine
        .cancel_task(task_id, actor("lead"))
        .await
        .expect_err("merged task is terminal");
    assert!(matches!(
        err,
        WorkflowEngineError::Validation(ref rejection)
            if rejection.contains(&ConditionViolation::TerminalState(state("merged")))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_dispatch_is_a_warning_not_a_rollback() {
    let stack = Stack::with_dispatcher(
        review_workflow(),
        EngineConfig::default(),
        RecordingDispatcher::new().failing("webhook"),
    );
    let task_id = stack
        .task(request("Flaky deploy").with_assignee(assignee()))
        .await;
    stack.walk(task_id, &["coding", "review"]).await;

    let outcome = stack
        .engine
        .transition_task(
            task_id,
            TransitionRequest::new(state("merged"), actor("lead").with_roles(["maintainer"]))
                .with_approvals(3),
        )
        .await
        .expect("transition commits despite the failed action");

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.task.status(), &state("merged"));
    let history = stack.engine.history(task_id).await.expect("history loads");
    assert_eq!(history.len(), 4);
}
