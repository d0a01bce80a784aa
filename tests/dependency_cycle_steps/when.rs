//! When steps for dependency graph BDD scenarios.

use super::world::{DependencyWorld, run_async};
use eyre::WrapErr;
use gantry::graph::services::AddDependencyRequest;
use rstest_bdd_macros::when;

#[when(r#""{task}" is made to depend on "{depends_on}""#)]
fn add_dependency(
    world: &mut DependencyWorld,
    task: String,
    depends_on: String,
) -> Result<(), eyre::Report> {
    let request = AddDependencyRequest::new(world.id_of(&task)?, world.id_of(&depends_on)?);
    world.last_add = Some(run_async(world.graph.add_dependency(request)));
    Ok(())
}

#[when("the project critical path is computed")]
fn compute_project_path(world: &mut DependencyWorld) -> Result<(), eyre::Report> {
    let path = run_async(world.graph.compute_project_critical_path())
        .wrap_err("compute project critical path")?;
    world.last_path = Some(path);
    Ok(())
}
