#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident store capability with in-memory and `Postgres` implementations.
//!
//! [`IncidentStore`] is the single seam between the analytics layer, the
//! HTTP API and whatever holds the incidents. Callers receive a store as an
//! explicit `Arc<dyn IncidentStore>`; nothing here reads process-wide
//! state except [`db::connect_from_env`].
//!
//! The `Postgres` store uses `switchy_database` raw SQL and
//! `switchy_schema` embedded migrations.

pub mod db;
pub mod memory;
pub mod queries;

use async_trait::async_trait;
use crime_insights_analytics_models::{GroupCount, GroupKey};
use crime_insights_database_models::{IncidentFilter, PageRequest};
use crime_insights_incident_models::{IncidentPatch, IncidentRecord, NewIncident};
use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

pub use memory::MemoryStore;
pub use queries::PgIncidentStore;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// A queryable collection of incidents.
///
/// Implementations must be safe to share between concurrent requests. No
/// read operation is synchronized with writes; a reader may observe any
/// state consistent with some ordering of concurrent writes.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Stores a new incident and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be written.
    async fn create(&self, incident: &NewIncident) -> Result<IncidentRecord, DbError>;

    /// Looks up an incident by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    async fn get(&self, id: i64) -> Result<Option<IncidentRecord>, DbError>;

    /// Applies a partial update. Returns `None` if no incident has `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be written.
    async fn update(
        &self,
        id: i64,
        patch: &IncidentPatch,
    ) -> Result<Option<IncidentRecord>, DbError>;

    /// Removes an incident, returning it. Returns `None` if no incident has
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be written.
    async fn delete(&self, id: i64) -> Result<Option<IncidentRecord>, DbError>;

    /// Counts incidents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError>;

    /// Returns one sorted page of incidents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    async fn find(
        &self,
        filter: &IncidentFilter,
        page: &PageRequest,
    ) -> Result<Vec<IncidentRecord>, DbError>;

    /// Groups incidents matching `filter` by `key` and counts each group.
    ///
    /// Raw-field groupings bucket missing values under `UNKNOWN`;
    /// temporal groupings drop incidents without a report timestamp. The
    /// result is in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    async fn aggregate(
        &self,
        filter: &IncidentFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupCount>, DbError>;

    /// Stores many incidents at once, returning how many were inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be written.
    async fn insert_many(&self, incidents: &[NewIncident]) -> Result<u64, DbError>;

    /// Removes every incident, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be written.
    async fn clear(&self) -> Result<u64, DbError>;
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
