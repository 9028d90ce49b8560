#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident filter predicates, sort order and paging parameters.
//!
//! These types describe *which* incidents a store operation touches. They
//! are interpreted directly by the in-memory store and translated to SQL
//! by the `Postgres` store.

use std::cmp::Ordering;

use crime_insights_analytics_models::temporal::in_year;
use crime_insights_incident_models::{IncidentField, IncidentRecord, is_blank};
use serde::{Deserialize, Serialize};

/// A single condition on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The field equals the given value exactly.
    Equals(IncidentField, String),
    /// The field has a non-blank value.
    Present(IncidentField),
    /// `REPORT_DAT` has a value.
    ReportedPresent,
    /// `REPORT_DAT` falls in the given calendar year.
    ReportedInYear(i32),
}

impl Predicate {
    /// Returns `true` if `record` satisfies this predicate.
    #[must_use]
    pub fn matches(&self, record: &IncidentRecord) -> bool {
        match self {
            Self::Equals(field, value) => record.field(*field) == Some(value.as_str()),
            Self::Present(field) => record.field(*field).is_some_and(|v| !is_blank(v)),
            Self::ReportedPresent => record.report_dat.is_some(),
            Self::ReportedInYear(year) => in_year(record.report_dat.as_ref(), *year),
        }
    }
}

/// A conjunction of predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// Conditions that must all hold.
    pub predicates: Vec<Predicate>,
}

impl IncidentFilter {
    /// Creates a filter that matches every incident.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Adds a predicate.
    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds an exact-match condition on a field.
    #[must_use]
    pub fn equals(self, field: IncidentField, value: impl Into<String>) -> Self {
        self.with(Predicate::Equals(field, value.into()))
    }

    /// Returns `true` if `record` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, record: &IncidentRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Sort order for incident listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSort {
    /// Most recently reported first. Undated incidents come last.
    #[default]
    ReportedDesc,
}

impl IncidentSort {
    /// Compares two records under this order, breaking ties by id.
    #[must_use]
    pub fn compare(self, a: &IncidentRecord, b: &IncidentRecord) -> Ordering {
        let by_date = match (a.report_dat, b.report_dat) {
            (Some(x), Some(y)) => match self {
                Self::ReportedDesc => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then(a.id.cmp(&b.id))
    }

    /// Returns the SQL `ORDER BY` body for this order.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::ReportedDesc => "report_dat DESC NULLS LAST, id ASC",
        }
    }
}

/// Which slice of a sorted listing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Sort order.
    pub sort: IncidentSort,
    /// Number of rows to skip.
    pub skip: u64,
    /// Maximum number of rows to return.
    pub limit: u64,
}

impl PageRequest {
    /// Builds a request for a 1-based page of `limit` rows, newest first.
    ///
    /// Both values are clamped to at least 1.
    #[must_use]
    pub fn page(page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        Self {
            sort: IncidentSort::ReportedDesc,
            skip: (page - 1).saturating_mul(limit),
            limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::page(1, 10)
    }
}
