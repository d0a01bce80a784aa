//! Then steps for task workflow BDD scenarios.

use super::world::{TaskWorkflowWorld, run_async};
use eyre::WrapErr;
use gantry::workflow::{domain::ConditionViolation, services::WorkflowEngineError};
use rstest_bdd_macros::then;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskWorkflowWorld, status: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let task = run_async(world.tasks.find_by_id(task_id))
        .wrap_err("load task")?
        .ok_or_else(|| eyre::eyre!("task {task_id} disappeared"))?;
    if task.status().as_str() != status {
        return Err(eyre::eyre!(
            "expected status {status}, found {}",
            task.status()
        ));
    }
    Ok(())
}

#[then("the task history holds {count:usize} records")]
fn history_holds(world: &TaskWorkflowWorld, count: usize) -> Result<(), eyre::Report> {
    let history = run_async(world.engine.history(world.task_id()?)).wrap_err("load history")?;
    if history.len() != count {
        return Err(eyre::eyre!(
            "expected {count} history records, found {}",
            history.len()
        ));
    }
    Ok(())
}

#[then("the task has a cycle time")]
fn task_has_cycle_time(world: &TaskWorkflowWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let task = run_async(world.tasks.find_by_id(task_id))
        .wrap_err("load task")?
        .ok_or_else(|| eyre::eyre!("task {task_id} disappeared"))?;
    if task.completion().is_none() {
        return Err(eyre::eyre!("expected completion figures on task {task_id}"));
    }
    Ok(())
}

#[then("the transition is rejected because no such transition exists")]
fn rejected_no_transition(world: &TaskWorkflowWorld) -> Result<(), eyre::Report> {
    expect_violation(world, |violation| {
        matches!(violation, ConditionViolation::NoSuchTransition { .. })
    })
}

#[then("the transition is rejected because the state is terminal")]
fn rejected_terminal(world: &TaskWorkflowWorld) -> Result<(), eyre::Report> {
    expect_violation(world, |violation| {
        matches!(violation, ConditionViolation::TerminalState(_))
    })
}

fn expect_violation(
    world: &TaskWorkflowWorld,
    predicate: impl Fn(&ConditionViolation) -> bool,
) -> Result<(), eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(WorkflowEngineError::Validation(rejection)))
            if rejection.violated_conditions.iter().any(&predicate) =>
        {
            Ok(())
        }
        other => Err(eyre::eyre!("expected a workflow rejection, got {other:?}")),
    }
}
