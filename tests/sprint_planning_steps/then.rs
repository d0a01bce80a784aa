//! Then steps for sprint planning BDD scenarios.

use super::world::{SprintWorld, run_async};
use eyre::WrapErr;
use gantry::sprint::services::SprintServiceError;
use rstest_bdd_macros::then;

#[then("the sprint has {committed:u32} committed points and {added:u32} added points")]
fn sprint_points(world: &SprintWorld, committed: u32, added: u32) -> Result<(), eyre::Report> {
    let sprint = world.sprint()?;
    if (sprint.committed_points(), sprint.added_points()) != (committed, added) {
        return Err(eyre::eyre!(
            "expected {committed} committed and {added} added, found {} and {}",
            sprint.committed_points(),
            sprint.added_points()
        ));
    }
    Ok(())
}

#[then("the scope change rate is {rate:f64}")]
fn scope_change_rate(world: &SprintWorld, rate: f64) -> Result<(), eyre::Report> {
    let actual = world.sprint()?.scope_change_rate();
    if actual.total_cmp(&rate).is_ne() {
        return Err(eyre::eyre!("expected scope change rate {rate}, found {actual}"));
    }
    Ok(())
}

#[then("the assignment is rejected for capacity")]
fn rejected_for_capacity(world: &SprintWorld) -> Result<(), eyre::Report> {
    match world.last_assignment.as_ref() {
        Some(Err(SprintServiceError::CapacityExceeded(_))) => Ok(()),
        other => Err(eyre::eyre!("expected a capacity rejection, got {other:?}")),
    }
}

#[then("the sprint completed {completed:u32} points with {carryover:u32} carried over")]
fn sprint_completed(
    world: &SprintWorld,
    completed: u32,
    carryover: u32,
) -> Result<(), eyre::Report> {
    let report = world
        .last_report
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing sprint report"))?;
    let sprint = &report.sprint;
    if (sprint.completed_points(), sprint.carryover_points()) != (completed, carryover) {
        return Err(eyre::eyre!(
            "expected {completed} completed and {carryover} carried over, found {} and {}",
            sprint.completed_points(),
            sprint.carryover_points()
        ));
    }
    Ok(())
}

#[then(r#""{title}" is no longer in the sprint"#)]
fn no_longer_in_sprint(world: &SprintWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.id_of(&title)?;
    let task = run_async(world.tasks.find_by_id(task_id))
        .wrap_err("load task")?
        .ok_or_else(|| eyre::eyre!("task {title} disappeared"))?;
    if task.sprint_id().is_some() {
        return Err(eyre::eyre!("task {title} is still in a sprint"));
    }
    Ok(())
}
