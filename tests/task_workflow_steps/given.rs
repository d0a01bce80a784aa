//! Given steps for task workflow BDD scenarios.

use super::world::{TaskWorkflowWorld, developer, run_async};
use eyre::WrapErr;
use gantry::task::{
    domain::{ActorId, TaskType},
    services::CreateTaskRequest,
};
use rstest_bdd_macros::given;

#[given(r#"a new task "{title}""#)]
fn new_task(world: &mut TaskWorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let reporter = ActorId::new("reporter").wrap_err("build reporter")?;
    let task = run_async(
        world
            .tasks
            .create_task(CreateTaskRequest::new(TaskType::Task, title, reporter)),
    )
    .wrap_err("create scenario task")?;
    world.task_id = Some(task.id());
    Ok(())
}

#[given("the task has been cancelled")]
fn task_cancelled(world: &mut TaskWorkflowWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    run_async(world.engine.cancel_task(task_id, developer()?)).wrap_err("cancel task")?;
    Ok(())
}
