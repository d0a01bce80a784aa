//! Given steps for dependency graph BDD scenarios.

use super::world::{DependencyWorld, run_async};
use eyre::WrapErr;
use gantry::graph::services::AddDependencyRequest;
use gantry::task::{
    domain::{ActorId, Minutes, TaskType},
    services::CreateTaskRequest,
};
use rstest_bdd_macros::given;

#[given(r#"a task "{title}" estimated at {hours:i64} hours"#)]
fn task_estimated(
    world: &mut DependencyWorld,
    title: String,
    hours: i64,
) -> Result<(), eyre::Report> {
    let reporter = ActorId::new("planner").wrap_err("build reporter")?;
    let request = CreateTaskRequest::new(TaskType::Task, title.as_str(), reporter)
        .with_time_estimate(Minutes::from_hours(hours));
    let task = run_async(world.tasks.create_task(request)).wrap_err("create scenario task")?;
    world.named.insert(title, task.id());
    Ok(())
}

#[given(r#""{task}" depends on "{depends_on}""#)]
fn existing_dependency(
    world: &mut DependencyWorld,
    task: String,
    depends_on: String,
) -> Result<(), eyre::Report> {
    let request = AddDependencyRequest::new(world.id_of(&task)?, world.id_of(&depends_on)?);
    run_async(world.graph.add_dependency(request)).wrap_err("add scenario dependency")?;
    Ok(())
}
