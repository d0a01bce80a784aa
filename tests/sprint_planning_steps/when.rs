//! When steps for sprint planning BDD scenarios.

use super::world::{SprintWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#""{title}" is added to the sprint"#)]
fn added_to_sprint(world: &mut SprintWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.id_of(&title)?;
    let result = run_async(world.planner.assign_task(world.sprint_id()?, task_id));
    world.last_assignment = Some(result);
    Ok(())
}

#[when("the sprint is closed")]
fn sprint_closed(world: &mut SprintWorld) -> Result<(), eyre::Report> {
    let report = run_async(world.planner.close_sprint(world.sprint_id()?))
        .wrap_err("close sprint")?;
    world.last_report = Some(report);
    Ok(())
}
