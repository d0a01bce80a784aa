//! Given steps for sprint planning BDD scenarios.

use super::world::{SprintWorld, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use gantry::sprint::services::CreateSprintRequest;
use gantry::task::{
    domain::{ActorId, TaskType},
    services::CreateTaskRequest,
};
use gantry::workflow::{
    domain::{Actor, StateId},
    services::TransitionRequest,
};
use mockable::{Clock, DefaultClock};
use rstest_bdd_macros::given;

#[given(r#"a sprint "{name}" with capacity {capacity:u32}"#)]
fn sprint_with_capacity(
    world: &mut SprintWorld,
    name: String,
    capacity: u32,
) -> Result<(), eyre::Report> {
    let today = DefaultClock.utc().date_naive();
    let request = CreateSprintRequest::new(name, today, today + TimeDelta::days(9), capacity);
    let sprint = run_async(world.planner.create_sprint(request)).wrap_err("create sprint")?;
    world.sprint_id = Some(sprint.id());
    Ok(())
}

#[given(r#"a task "{title}" worth {points:u32} points"#)]
fn task_worth(world: &mut SprintWorld, title: String, points: u32) -> Result<(), eyre::Report> {
    let reporter = ActorId::new("reporter").wrap_err("build reporter")?;
    let request =
        CreateTaskRequest::new(TaskType::Story, title.as_str(), reporter).with_estimate(points);
    let task = run_async(world.tasks.create_task(request)).wrap_err("create scenario task")?;
    world.named.insert(title, task.id());
    Ok(())
}

#[given(r#""{title}" is committed to the sprint"#)]
fn committed(world: &mut SprintWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.id_of(&title)?;
    run_async(world.planner.assign_task(world.sprint_id()?, task_id))
        .wrap_err("commit task to sprint")?;
    Ok(())
}

#[given("the sprint has started")]
fn sprint_started(world: &mut SprintWorld) -> Result<(), eyre::Report> {
    run_async(world.planner.start_sprint(world.sprint_id()?)).wrap_err("start sprint")?;
    Ok(())
}

#[given(r#""{title}" has been delivered"#)]
fn delivered(world: &mut SprintWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.id_of(&title)?;
    let actor = Actor::new(ActorId::new("dev").wrap_err("build actor")?);
    for status in ["todo", "in_progress", "done"] {
        let target = StateId::new(status).wrap_err("build status")?;
        run_async(
            world
                .engine
                .transition_task(task_id, TransitionRequest::new(target, actor.clone())),
        )
        .wrap_err_with(|| format!("move {title} to {status}"))?;
    }
    Ok(())
}
