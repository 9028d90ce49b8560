#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grouping, ranking and proportion engine behind the crime question
//! catalog.
//!
//! The [`catalog::QueryCatalog`] answers eight fixed questions about the
//! incident dataset. Each question asks the injected store for a grouped
//! count, ranks the groups with [`ranking::rank`], optionally converts
//! them to percentages with [`proportion::proportions`], and shapes the
//! result. Nothing is cached: every call reads the store again.

pub mod catalog;
pub mod proportion;
pub mod ranking;

use crime_insights_database::DbError;
use thiserror::Error;

pub use catalog::QueryCatalog;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The store could not be read.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
