#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for loading the DC crime incident dataset into an incident
//! store.
//!
//! The dataset is fetched (or read from disk), normalized into
//! [`NewIncident`]s by [`dc::parse_dataset`], and written to the store in
//! batches by [`seed`].

pub mod dc;
pub mod fetch;
pub mod parsing;
pub mod progress;

use std::path::Path;

use crime_insights_analytics::AnalyticsError;
use crime_insights_database::{DbError, IncidentStore};
use crime_insights_incident_models::NewIncident;

pub use dc::{DEFAULT_DATASET_URL, parse_dataset};
pub use fetch::fetch_dataset;

use progress::ProgressCallback;

/// Number of incidents written per store call.
pub const SEED_BATCH_SIZE: usize = 1000;

/// Errors that can occur while ingesting.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The incident store rejected a write.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// A catalog query failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    /// No catalog question has the given slug.
    #[error("Unknown question: {slug}")]
    UnknownQuestion {
        /// The slug that did not match.
        slug: String,
    },
}

/// Whether seeding replaces or extends the stored incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// Delete every stored incident first.
    Replace,
    /// Keep existing incidents.
    Append,
}

/// Outcome of a [`seed`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Incidents deleted before inserting.
    pub cleared: u64,
    /// Incidents inserted.
    pub inserted: u64,
}

/// Reads and parses a dataset document from disk.
///
/// # Errors
///
/// * If the file cannot be read
/// * If the contents are not a recognized dataset document
pub fn load_file(path: &Path) -> Result<Vec<NewIncident>, IngestError> {
    log::info!("Reading dataset from {}", path.display());
    let data = std::fs::read_to_string(path)?;
    parse_dataset(&data)
}

/// Writes `incidents` to `store` in batches of [`SEED_BATCH_SIZE`].
///
/// # Errors
///
/// * If clearing or inserting fails. Batches written before the failure
///   stay in the store.
pub async fn seed(
    store: &dyn IncidentStore,
    incidents: &[NewIncident],
    mode: SeedMode,
    progress: &dyn ProgressCallback,
) -> Result<SeedSummary, IngestError> {
    let mut summary = SeedSummary::default();

    if mode == SeedMode::Replace {
        log::info!("Clearing stored incidents...");
        summary.cleared = store.clear().await?;
        log::info!("Cleared {} incidents", summary.cleared);
    }

    if incidents.is_empty() {
        log::warn!("No incidents parsed from dataset");
        return Ok(summary);
    }

    progress.set_total(incidents.len() as u64);

    for batch in incidents.chunks(SEED_BATCH_SIZE) {
        let inserted = store.insert_many(batch).await?;
        summary.inserted += inserted;
        progress.inc(inserted);
    }

    progress.finish(format!("{} incidents", summary.inserted));
    log::info!("Inserted {} incidents", summary.inserted);

    Ok(summary)
}
