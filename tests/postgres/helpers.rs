//! Shared test helpers for `PostgreSQL` integration tests.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use gantry::config::EngineConfig;
use gantry::graph::services::DependencyService;
use gantry::task::{
    adapters::postgres::{PostgresTaskStore, TaskPgPool},
    services::TaskLifecycleService,
};
use gantry::workflow::{
    adapters::memory::RecordingDispatcher, domain::Workflow, services::WorkflowEngine,
};
use mockable::DefaultClock;
use rstest::fixture;
use uuid::Uuid;

/// Environment variable holding a superuser connection URL.
pub const ADMIN_URL_VAR: &str = "GANTRY_TEST_PG_ADMIN_URL";

/// SQL that creates the task tables.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-01-01-000000_create_tasks/up.sql");

/// Boxed error type for fixture setup.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A migrated database dropped when the value goes out of scope.
pub struct TemporaryDatabase {
    admin_url: String,
    name: String,
    pool: TaskPgPool,
}

impl TemporaryDatabase {
    /// Creates and migrates a uniquely named database.
    ///
    /// # Errors
    ///
    /// Returns an error when the server is unreachable or migration fails.
    pub fn create(admin_url: &str) -> Result<Self, BoxError> {
        let name = format!("gantry_test_{}", Uuid::new_v4().simple());
        let mut admin = PgConnection::establish(admin_url)?;
        diesel::sql_query(format!("CREATE DATABASE \"{name}\"")).execute(&mut admin)?;

        let url = database_url(admin_url, &name);
        let pool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(url))?;
        pool.get()?.batch_execute(CREATE_SCHEMA_SQL)?;
        Ok(Self {
            admin_url: admin_url.to_owned(),
            name,
            pool,
        })
    }

    /// Returns a store over the database.
    #[must_use]
    pub fn store(&self) -> PostgresTaskStore {
        PostgresTaskStore::new(self.pool.clone())
    }
}

impl Drop for TemporaryDatabase {
    fn drop(&mut self) {
        if let Ok(mut admin) = PgConnection::establish(&self.admin_url) {
            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name);
            drop(diesel::sql_query(drop_sql).execute(&mut admin));
        }
    }
}

fn database_url(admin_url: &str, name: &str) -> String {
    match admin_url.rsplit_once('/') {
        Some((base, _)) => format!("{base}/{name}"),
        None => format!("{admin_url}/{name}"),
    }
}

/// Every service wired over one `PostgreSQL` store.
pub struct PgStack {
    pub store: Arc<PostgresTaskStore>,
    pub tasks: TaskLifecycleService<PostgresTaskStore, DefaultClock>,
    pub engine: WorkflowEngine<PostgresTaskStore, RecordingDispatcher, DefaultClock>,
    pub graph: DependencyService<PostgresTaskStore, DefaultClock>,
    _database: TemporaryDatabase,
}

impl PgStack {
    fn new(database: TemporaryDatabase) -> Self {
        let store = Arc::new(database.store());
        let clock = Arc::new(DefaultClock);
        let workflow = Arc::new(Workflow::standard());
        let config = EngineConfig::default();
        Self {
            tasks: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&workflow),
                config.clone(),
            ),
            engine: WorkflowEngine::new(
                Arc::clone(&store),
                Arc::new(RecordingDispatcher::new()),
                Arc::clone(&clock),
                workflow,
            ),
            graph: DependencyService::new(Arc::clone(&store), clock, config),
            store,
            _database: database,
        }
    }
}

/// Provides a migrated stack, or `None` when no server is configured.
///
/// # Panics
///
/// Panics when a server is configured but the database cannot be created.
#[fixture]
pub fn pg_stack() -> Option<PgStack> {
    let admin_url = std::env::var(ADMIN_URL_VAR).ok()?;
    let database = TemporaryDatabase::create(&admin_url).expect("create test database");
    Some(PgStack::new(database))
}
