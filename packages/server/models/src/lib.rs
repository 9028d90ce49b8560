#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime insights server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the store types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use crime_insights_database_models::{IncidentFilter, PageRequest};
use crime_insights_incident_models::{IncidentField, IncidentRecord};
use serde::{Deserialize, Serialize};

/// Page size used when `limit` is absent or unusable.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Largest page size a listing will return.
pub const MAX_PAGE_LIMIT: u64 = 1000;

/// Response for `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiRoot {
    /// Always `true`.
    pub ok: bool,
    /// Service name.
    pub service: String,
    /// Server time.
    pub time: DateTime<Utc>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Query parameters for `GET /api/crimes`.
///
/// Paging values arrive as raw strings so that malformed numbers fall back
/// to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrimeListParams {
    /// 1-based page number.
    pub page: Option<String>,
    /// Rows per page.
    pub limit: Option<String>,
    /// Exact-match `OFFENSE` filter.
    #[serde(rename = "OFFENSE")]
    pub offense: Option<String>,
    /// Exact-match `SHIFT` filter.
    #[serde(rename = "SHIFT")]
    pub shift: Option<String>,
    /// Exact-match `METHOD` filter.
    #[serde(rename = "METHOD")]
    pub method: Option<String>,
    /// Exact-match `WARD` filter.
    #[serde(rename = "WARD")]
    pub ward: Option<String>,
    /// Exact-match `PSA` filter.
    #[serde(rename = "PSA")]
    pub psa: Option<String>,
    /// Exact-match `NEIGHBORHOOD_CLUSTER` filter.
    #[serde(rename = "NEIGHBORHOOD_CLUSTER")]
    pub neighborhood_cluster: Option<String>,
}

impl CrimeListParams {
    /// The requested page, defaulting to 1.
    #[must_use]
    pub fn page(&self) -> u64 {
        parse_count(self.page.as_deref(), 1)
    }

    /// The requested page size, defaulting to [`DEFAULT_PAGE_LIMIT`] and
    /// capped at [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn limit(&self) -> u64 {
        parse_count(self.limit.as_deref(), DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT)
    }

    /// Paging and sort for the store query.
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::page(self.page(), self.limit())
    }

    /// Builds the store filter from the non-empty field parameters.
    #[must_use]
    pub fn filter(&self) -> IncidentFilter {
        [
            (IncidentField::Offense, &self.offense),
            (IncidentField::Shift, &self.shift),
            (IncidentField::Method, &self.method),
            (IncidentField::Ward, &self.ward),
            (IncidentField::Psa, &self.psa),
            (IncidentField::NeighborhoodCluster, &self.neighborhood_cluster),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
        .fold(IncidentFilter::all(), |filter, (field, value)| {
            filter.equals(field, value)
        })
    }
}

/// Parses a paging number. Missing, non-numeric and zero values take
/// `default`; negative values clamp to 1.
fn parse_count(raw: Option<&str>, default: u64) -> u64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        None | Some(0) => default,
        Some(n) => u64::try_from(n).unwrap_or(1),
    }
}

/// Response for `GET /api/crimes`.
#[derive(Debug, Serialize)]
pub struct ApiListResponse {
    /// Number of incidents matching the filter, ignoring paging.
    pub total: u64,
    /// The page returned.
    pub page: u64,
    /// The page size used.
    pub limit: u64,
    /// Incidents on this page.
    pub rows: Vec<IncidentRecord>,
}

/// A single incident wrapped in an ok envelope.
#[derive(Debug, Serialize)]
pub struct ApiDoc {
    /// Always `true`.
    pub ok: bool,
    /// The incident.
    pub doc: IncidentRecord,
}

impl ApiDoc {
    /// Wraps `doc`.
    #[must_use]
    pub const fn new(doc: IncidentRecord) -> Self {
        Self { ok: true, doc }
    }
}

/// Response for a successful delete.
#[derive(Debug, Serialize)]
pub struct ApiDeleted {
    /// Always `true`.
    pub ok: bool,
    /// Id of the deleted incident.
    pub deleted: i64,
}

/// Error body.
///
/// Client errors carry `ok: false`; server errors only carry `error`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Present and `false` on client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// A client error (4xx).
    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: Some(false),
            error: error.into(),
        }
    }

    /// A server error (5xx).
    #[must_use]
    pub fn internal(error: impl Into<String>) -> Self {
        Self {
            ok: None,
            error: error.into(),
        }
    }
}

/// Query parameters for `GET /api/questions/{slug}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionQuery {
    /// Year for the offense ranking.
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_insights_database_models::Predicate;

    fn params(page: Option<&str>, limit: Option<&str>) -> CrimeListParams {
        CrimeListParams {
            page: page.map(ToString::to_string),
            limit: limit.map(ToString::to_string),
            ..CrimeListParams::default()
        }
    }

    #[test]
    fn paging_defaults_to_first_page_of_ten() {
        let p = params(None, None);
        assert_eq!((p.page(), p.limit()), (1, 10));
        assert_eq!(p.page_request(), PageRequest::page(1, 10));
    }

    #[test]
    fn malformed_paging_values_fall_back() {
        assert_eq!(params(Some("abc"), Some("")).page(), 1);
        assert_eq!(params(Some("abc"), Some("")).limit(), 10);
        assert_eq!(params(Some("0"), Some("0")).limit(), 10);
        assert_eq!(params(Some("-4"), Some("-2")).page(), 1);
        assert_eq!(params(Some("-4"), Some("-2")).limit(), 1);
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(params(None, Some("5000")).limit(), MAX_PAGE_LIMIT);
        assert_eq!(params(Some("3"), Some("25")).page_request().skip, 50);
    }

    #[test]
    fn filter_uses_non_empty_fields_only() {
        let p = CrimeListParams {
            offense: Some("THEFT/OTHER".to_string()),
            ward: Some(String::new()),
            psa: Some("207".to_string()),
            ..CrimeListParams::default()
        };

        assert_eq!(
            p.filter().predicates,
            vec![
                Predicate::Equals(IncidentField::Offense, "THEFT/OTHER".to_string()),
                Predicate::Equals(IncidentField::Psa, "207".to_string()),
            ]
        );
        assert_eq!(CrimeListParams::default().filter(), IncidentFilter::all());
    }

    #[test]
    fn error_bodies_differ_by_class() {
        assert_eq!(
            serde_json::to_value(ApiError::rejected("Not found")).unwrap(),
            serde_json::json!({ "ok": false, "error": "Not found" })
        );
        assert_eq!(
            serde_json::to_value(ApiError::internal("boom")).unwrap(),
            serde_json::json!({ "error": "boom" })
        );
    }
}
