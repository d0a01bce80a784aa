//! `PostgreSQL` implementation of the task store.

use super::{
    models::{DependencyRow, NewTransitionRow, TaskRow, TransitionRow},
    schema::{state_transitions, task_dependencies, tasks},
};
use crate::graph::domain::{DependencyGraph, DependencyType, TaskDependency};
use crate::task::{
    domain::{
        ActorId, Completion, Minutes, PersistedTaskData, Priority, SprintId, Task, TaskId,
        TaskType, TaskVersion,
    },
    ports::{ConflictError, NotFoundError, TaskQuery, TaskStore, TaskStoreError, TaskStoreResult},
};
use crate::workflow::domain::{StateId, StateTransition, TransitionTrigger};
use async_trait::async_trait;
use chrono::TimeDelta;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::Error as DieselError;

/// `PostgreSQL` connection pool type used by the task store.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
///
/// Task rows are updated with `WHERE version = expected`; dependency inserts
/// run in a `SERIALIZABLE` transaction that re-reads the edge set.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

impl From<DieselError> for TaskStoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn create(&self, task: &Task, initial: &StateTransition) -> TaskStoreResult<()> {
        let task_id = task.id();
        let row = to_task_row(task, task.version())?;
        let record = to_transition_row(initial);

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                diesel::insert_into(tasks::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(
                            diesel::result::DatabaseErrorKind::UniqueViolation,
                            _,
                        ) => TaskStoreError::DuplicateTask(task_id),
                        other => TaskStoreError::persistence(other),
                    })?;
                diesel::insert_into(state_transitions::table)
                    .values(&record)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn update_with_version(
        &self,
        task: &Task,
        expected: TaskVersion,
    ) -> TaskStoreResult<Task> {
        let row = to_task_row(task, expected.next())?;
        let mut updated = task.clone();
        updated.set_version(expected.next());

        self.run_blocking(move |connection| replace_checked(connection, &row, expected))
            .await?;
        Ok(updated)
    }

    async fn commit_transition(
        &self,
        task: &Task,
        expected: TaskVersion,
        record: &StateTransition,
    ) -> TaskStoreResult<Task> {
        let row = to_task_row(task, expected.next())?;
        let record_row = to_transition_row(record);
        let mut updated = task.clone();
        updated.set_version(expected.next());

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                replace_checked(tx, &row, expected)?;
                diesel::insert_into(state_transitions::table)
                    .values(&record_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await?;
        Ok(updated)
    }

    async fn append_transition(&self, record: &StateTransition) -> TaskStoreResult<()> {
        let task_id = record.task_id();
        let row = to_transition_row(record);
        self.run_blocking(move |connection| {
            ensure_task_exists(connection, task_id)?;
            diesel::insert_into(state_transitions::table)
                .values(&row)
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    async fn transitions(&self, task_id: TaskId) -> TaskStoreResult<Vec<StateTransition>> {
        self.run_blocking(move |connection| {
            state_transitions::table
                .filter(state_transitions::task_id.eq(task_id.into_inner()))
                .order(state_transitions::id.asc())
                .select(TransitionRow::as_select())
                .load::<TransitionRow>(connection)?
                .into_iter()
                .map(row_to_transition)
                .collect()
        })
        .await
    }

    async fn list_tasks(&self, query: &TaskQuery) -> TaskStoreResult<Vec<Task>> {
        let filter = query.clone();
        self.run_blocking(move |connection| {
            let mut statement = tasks::table.into_boxed();
            if let Some(ids) = filter.ids {
                let raw_ids: Vec<uuid::Uuid> = ids.into_iter().map(TaskId::into_inner).collect();
                statement = statement.filter(tasks::id.eq_any(raw_ids));
            }
            if let Some(sprint_id) = filter.sprint_id {
                statement = statement.filter(tasks::sprint_id.eq(sprint_id.into_inner()));
            }
            if let Some(parent_id) = filter.parent_id {
                statement = statement.filter(tasks::parent_id.eq(parent_id.into_inner()));
            }
            if let Some(assignees) = filter.assignees {
                let names: Vec<String> = assignees
                    .into_iter()
                    .map(|actor| actor.as_str().to_owned())
                    .collect();
                statement = statement.filter(tasks::assignee.eq_any(names));
            }
            statement
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn list_edges(&self, task_id: TaskId) -> TaskStoreResult<Vec<TaskDependency>> {
        self.run_blocking(move |connection| {
            let id = task_id.into_inner();
            task_dependencies::table
                .filter(
                    task_dependencies::task_id
                        .eq(id)
                        .or(task_dependencies::depends_on_id.eq(id)),
                )
                .select(DependencyRow::as_select())
                .load::<DependencyRow>(connection)?
                .into_iter()
                .map(row_to_dependency)
                .collect()
        })
        .await
    }

    async fn all_edges(&self) -> TaskStoreResult<Vec<TaskDependency>> {
        self.run_blocking(load_all_edges).await
    }

    async fn insert_dependency(&self, dependency: &TaskDependency) -> TaskStoreResult<()> {
        let edge = *dependency;
        let row = to_dependency_row(dependency);
        self.run_blocking(move |connection| {
            connection
                .build_transaction()
                .serializable()
                .run::<_, TaskStoreError, _>(|tx| {
                    ensure_task_exists(tx, edge.task_id())?;
                    ensure_task_exists(tx, edge.depends_on_id())?;

                    let mut graph = DependencyGraph::from_edges(load_all_edges(tx)?);
                    graph.add_edge(edge)?;

                    diesel::insert_into(task_dependencies::table)
                        .values(&row)
                        .on_conflict((
                            task_dependencies::task_id,
                            task_dependencies::depends_on_id,
                        ))
                        .do_update()
                        .set((
                            task_dependencies::dependency_type.eq(&row.dependency_type),
                            task_dependencies::lag_minutes.eq(row.lag_minutes),
                        ))
                        .execute(tx)?;
                    Ok(())
                })
        })
        .await
    }

    async fn remove_dependency(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> TaskStoreResult<bool> {
        self.run_blocking(move |connection| {
            let removed = diesel::delete(
                task_dependencies::table
                    .filter(task_dependencies::task_id.eq(task_id.into_inner()))
                    .filter(task_dependencies::depends_on_id.eq(depends_on_id.into_inner())),
            )
            .execute(connection)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> TaskStoreResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                let raw = id.into_inner();
                ensure_task_exists(tx, id)?;

                let mut dependents: Vec<uuid::Uuid> = task_dependencies::table
                    .filter(task_dependencies::depends_on_id.eq(raw))
                    .select(task_dependencies::task_id)
                    .load(tx)?;
                let children: Vec<uuid::Uuid> = tasks::table
                    .filter(tasks::parent_id.eq(raw))
                    .select(tasks::id)
                    .load(tx)?;
                dependents.extend(children);
                dependents.sort_unstable();
                dependents.dedup();
                if !dependents.is_empty() {
                    return Err(TaskStoreError::Referenced {
                        task_id: id,
                        dependents: dependents.into_iter().map(TaskId::from_uuid).collect(),
                    });
                }

                diesel::delete(state_transitions::table.filter(state_transitions::task_id.eq(raw)))
                    .execute(tx)?;
                diesel::delete(task_dependencies::table.filter(task_dependencies::task_id.eq(raw)))
                    .execute(tx)?;
                diesel::delete(tasks::table.filter(tasks::id.eq(raw))).execute(tx)?;
                Ok(())
            })
        })
        .await
    }
}

fn replace_checked(
    connection: &mut PgConnection,
    row: &TaskRow,
    expected: TaskVersion,
) -> TaskStoreResult<()> {
    let expected_raw = version_to_i64(expected)?;
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(row.id))
            .filter(tasks::version.eq(expected_raw)),
    )
    .set(row)
    .execute(connection)?;
    if updated == 1 {
        return Ok(());
    }

    let actual = tasks::table
        .filter(tasks::id.eq(row.id))
        .select(tasks::version)
        .first::<i64>(connection)
        .optional()?;
    let task_id = TaskId::from_uuid(row.id);
    match actual {
        None => Err(NotFoundError::task(task_id).into()),
        Some(actual) => Err(ConflictError {
            task_id,
            expected_version: expected,
            actual_version: version_from_i64(actual)?,
        }
        .into()),
    }
}

fn ensure_task_exists(connection: &mut PgConnection, id: TaskId) -> TaskStoreResult<()> {
    let found = tasks::table
        .filter(tasks::id.eq(id.into_inner()))
        .select(tasks::id)
        .first::<uuid::Uuid>(connection)
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(NotFoundError::task(id).into()),
    }
}

fn load_all_edges(connection: &mut PgConnection) -> TaskStoreResult<Vec<TaskDependency>> {
    task_dependencies::table
        .order((task_dependencies::task_id.asc(), task_dependencies::depends_on_id.asc()))
        .select(DependencyRow::as_select())
        .load::<DependencyRow>(connection)?
        .into_iter()
        .map(row_to_dependency)
        .collect()
}

fn version_to_i64(version: TaskVersion) -> TaskStoreResult<i64> {
    i64::try_from(version.value()).map_err(TaskStoreError::persistence)
}

fn version_from_i64(raw: i64) -> TaskStoreResult<TaskVersion> {
    u64::try_from(raw)
        .map(TaskVersion::new)
        .map_err(TaskStoreError::persistence)
}

fn to_task_row(task: &Task, version: TaskVersion) -> TaskStoreResult<TaskRow> {
    let labels = serde_json::to_value(task.labels()).map_err(TaskStoreError::persistence)?;
    let estimate = task
        .estimate()
        .map(i32::try_from)
        .transpose()
        .map_err(TaskStoreError::persistence)?;
    let completion = task.completion();

    Ok(TaskRow {
        id: task.id().into_inner(),
        task_type: task.task_type().as_str().to_owned(),
        title: task.title().to_owned(),
        description: task.description().map(str::to_owned),
        status: task.status().as_str().to_owned(),
        priority: task.priority().as_str().to_owned(),
        parent_id: task.parent_id().map(TaskId::into_inner),
        estimate,
        time_estimate_minutes: task.time_estimate().map(Minutes::value),
        actual_time_minutes: task.actual_time().map(Minutes::value),
        assignee: task.assignee().map(|actor| actor.as_str().to_owned()),
        labels,
        sprint_id: task.sprint_id().map(SprintId::into_inner),
        completed_at: completion.map(|done| done.completed_at),
        cycle_time_seconds: completion.map(|done| done.cycle_time.num_seconds()),
        lead_time_seconds: completion.map(|done| done.lead_time.num_seconds()),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        version: version_to_i64(version)?,
    })
}

fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let TaskRow {
        id,
        task_type,
        title,
        description,
        status,
        priority,
        parent_id,
        estimate,
        time_estimate_minutes,
        actual_time_minutes,
        assignee,
        labels,
        sprint_id,
        completed_at,
        cycle_time_seconds,
        lead_time_seconds,
        created_at,
        updated_at,
        version,
    } = row;

    let completion = completed_at.map(|completed_at| Completion {
        completed_at,
        cycle_time: seconds_to_delta(cycle_time_seconds),
        lead_time: seconds_to_delta(lead_time_seconds),
    });

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        task_type: TaskType::try_from(task_type.as_str()).map_err(TaskStoreError::persistence)?,
        title,
        description,
        status: StateId::new(status).map_err(TaskStoreError::persistence)?,
        priority: Priority::try_from(priority.as_str()).map_err(TaskStoreError::persistence)?,
        parent_id: parent_id.map(TaskId::from_uuid),
        estimate: estimate
            .map(u32::try_from)
            .transpose()
            .map_err(TaskStoreError::persistence)?,
        time_estimate: time_estimate_minutes.map(Minutes::new),
        actual_time: actual_time_minutes.map(Minutes::new),
        assignee: assignee
            .map(ActorId::new)
            .transpose()
            .map_err(TaskStoreError::persistence)?,
        labels: serde_json::from_value(labels).map_err(TaskStoreError::persistence)?,
        sprint_id: sprint_id.map(SprintId::from_uuid),
        completion,
        created_at,
        updated_at,
        version: version_from_i64(version)?,
    };
    Ok(Task::from_persisted(data))
}

fn seconds_to_delta(seconds: Option<i64>) -> TimeDelta {
    seconds
        .and_then(TimeDelta::try_seconds)
        .unwrap_or_default()
}

fn to_dependency_row(dependency: &TaskDependency) -> DependencyRow {
    DependencyRow {
        task_id: dependency.task_id().into_inner(),
        depends_on_id: dependency.depends_on_id().into_inner(),
        dependency_type: dependency.dependency_type().as_str().to_owned(),
        lag_minutes: dependency.lag().value(),
    }
}

fn row_to_dependency(row: DependencyRow) -> TaskStoreResult<TaskDependency> {
    let dependency_type = DependencyType::try_from(row.dependency_type.as_str())
        .map_err(TaskStoreError::persistence)?;
    TaskDependency::new(
        TaskId::from_uuid(row.task_id),
        TaskId::from_uuid(row.depends_on_id),
        dependency_type,
        Minutes::new(row.lag_minutes),
    )
    .map_err(TaskStoreError::persistence)
}

fn to_transition_row(record: &StateTransition) -> NewTransitionRow {
    NewTransitionRow {
        task_id: record.task_id().into_inner(),
        from_status: record.from_status().map(|status| status.as_str().to_owned()),
        to_status: record.to_status().as_str().to_owned(),
        actor_id: record.actor_id().as_str().to_owned(),
        transitioned_at: record.transitioned_at(),
        triggered_by: record.triggered_by().as_str().to_owned(),
        duration_in_state_seconds: record.duration_in_state().map(|delta| delta.num_seconds()),
    }
}

fn row_to_transition(row: TransitionRow) -> TaskStoreResult<StateTransition> {
    let task_id = TaskId::from_uuid(row.task_id);
    let to_status = StateId::new(row.to_status).map_err(TaskStoreError::persistence)?;
    let actor_id = ActorId::new(row.actor_id).map_err(TaskStoreError::persistence)?;
    let Some(from_status) = row.from_status else {
        return Ok(StateTransition::creation(
            task_id,
            to_status,
            actor_id,
            row.transitioned_at,
        ));
    };
    Ok(StateTransition::change(
        task_id,
        StateId::new(from_status).map_err(TaskStoreError::persistence)?,
        to_status,
        actor_id,
        row.transitioned_at,
        TransitionTrigger::try_from(row.triggered_by.as_str())
            .map_err(TaskStoreError::persistence)?,
        row.duration_in_state_seconds.and_then(TimeDelta::try_seconds),
    ))
}
