//! Then steps for dependency graph BDD scenarios.

use super::world::{DependencyWorld, run_async};
use eyre::WrapErr;
use gantry::graph::services::GraphServiceError;
use gantry::task::{domain::Minutes, ports::TaskStore};
use rstest_bdd_macros::then;

#[then(r#"the dependency is rejected with the cycle "{titles}""#)]
fn rejected_with_cycle(world: &DependencyWorld, titles: String) -> Result<(), eyre::Report> {
    let expected = world.ids_of(&titles)?;
    match world.last_add.as_ref() {
        Some(Err(GraphServiceError::CircularDependency(err))) if err.cycle == expected => Ok(()),
        other => Err(eyre::eyre!("expected cycle {titles}, got {other:?}")),
    }
}

#[then("the dependency is rejected as invalid")]
fn rejected_as_invalid(world: &DependencyWorld) -> Result<(), eyre::Report> {
    match world.last_add.as_ref() {
        Some(Err(GraphServiceError::Validation(_))) => Ok(()),
        other => Err(eyre::eyre!("expected a validation error, got {other:?}")),
    }
}

#[then("the graph holds {count:usize} edge")]
fn graph_holds_one(world: &DependencyWorld, count: usize) -> Result<(), eyre::Report> {
    graph_holds(world, count)
}

#[then("the graph holds {count:usize} edges")]
fn graph_holds(world: &DependencyWorld, count: usize) -> Result<(), eyre::Report> {
    let edges = run_async(world.store.all_edges()).wrap_err("load edges")?;
    if edges.len() != count {
        return Err(eyre::eyre!("expected {count} edges, found {}", edges.len()));
    }
    Ok(())
}

#[then(r#"the critical path is "{titles}""#)]
fn critical_path_is(world: &DependencyWorld, titles: String) -> Result<(), eyre::Report> {
    let expected = world.ids_of(&titles)?;
    let path = world
        .last_path
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing critical path"))?;
    if path.path != expected {
        return Err(eyre::eyre!("expected path {titles}, got {:?}", path.path));
    }
    Ok(())
}

#[then("the project takes {hours:i64} hours")]
fn project_takes(world: &DependencyWorld, hours: i64) -> Result<(), eyre::Report> {
    let path = world
        .last_path
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing critical path"))?;
    if path.project_duration != Minutes::from_hours(hours) {
        return Err(eyre::eyre!(
            "expected {hours} hours, got {:?}",
            path.project_duration
        ));
    }
    Ok(())
}

#[then(r#""{title}" has {hours:i64} hours of slack"#)]
fn task_has_slack(world: &DependencyWorld, title: String, hours: i64) -> Result<(), eyre::Report> {
    let task_id = world.id_of(&title)?;
    let path = world
        .last_path
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing critical path"))?;
    match path.slack.get(&task_id) {
        Some(slack) if *slack == Minutes::from_hours(hours) => Ok(()),
        other => Err(eyre::eyre!("expected {hours} hours of slack, got {other:?}")),
    }
}
