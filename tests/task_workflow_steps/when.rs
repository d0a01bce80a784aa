//! When steps for task workflow BDD scenarios.

use super::world::{TaskWorkflowWorld, developer, run_async};
use gantry::workflow::{domain::StateId, services::TransitionRequest};
use rstest_bdd_macros::when;

#[when(r#"the task moves to "{status}""#)]
fn task_moves(world: &mut TaskWorkflowWorld, status: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let target = StateId::new(status).map_err(|err| eyre::eyre!("invalid status: {err}"))?;
    let result = run_async(
        world
            .engine
            .transition_task(task_id, TransitionRequest::new(target, developer()?)),
    );
    world.last_result = Some(result);
    Ok(())
}
