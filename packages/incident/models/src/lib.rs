#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident record types and categorical field identifiers.
//!
//! An incident is one row of the DC crime dataset. Every attribute besides
//! the store-assigned identifier is optional: the dataset is externally
//! sourced and missing values are common. Categorical columns are kept as
//! free text; no value set is enforced here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Characters ignored when deciding whether a text value is blank.
///
/// The `Postgres` store trims the same set with `BTRIM`.
pub const BLANK_CHARS: &[char] = &[' ', '\t', '\r', '\n'];

/// Returns `true` if `value` is empty or holds only [`BLANK_CHARS`].
#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim_matches(BLANK_CHARS).is_empty()
}

/// The categorical text columns of an incident.
///
/// The string form of each variant is the dataset column name, which is
/// also the JSON key and the listing filter parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentField {
    /// Offense category label.
    Offense,
    /// Police shift (`DAY`, `EVENING`, `MIDNIGHT` in practice).
    Shift,
    /// Method (`GUN`, `KNIFE`, `OTHERS` in practice).
    Method,
    /// Ward identifier.
    Ward,
    /// Police service area.
    Psa,
    /// Neighborhood cluster name.
    NeighborhoodCluster,
}

impl IncidentField {
    /// Returns the SQL column holding this field.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Offense => "offense",
            Self::Shift => "shift",
            Self::Method => "method",
            Self::Ward => "ward",
            Self::Psa => "psa",
            Self::NeighborhoodCluster => "neighborhood_cluster",
        }
    }
}

/// A stored incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Store-assigned identifier.
    pub id: i64,
    /// Offense category.
    #[serde(rename = "OFFENSE")]
    pub offense: Option<String>,
    /// When the incident was reported.
    #[serde(rename = "REPORT_DAT")]
    pub report_dat: Option<DateTime<Utc>>,
    /// Start of the incident window.
    #[serde(rename = "START_DATE")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the incident window.
    #[serde(rename = "END_DATE")]
    pub end_date: Option<DateTime<Utc>>,
    /// Police shift.
    #[serde(rename = "SHIFT")]
    pub shift: Option<String>,
    /// Method.
    #[serde(rename = "METHOD")]
    pub method: Option<String>,
    /// Ward.
    #[serde(rename = "WARD")]
    pub ward: Option<String>,
    /// Police service area.
    #[serde(rename = "PSA")]
    pub psa: Option<String>,
    /// Neighborhood cluster.
    #[serde(rename = "NEIGHBORHOOD_CLUSTER")]
    pub neighborhood_cluster: Option<String>,
    /// Row creation time, managed by the store.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last modification time, managed by the store.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl IncidentRecord {
    /// Builds a record from a draft, stamping both bookkeeping times with
    /// `now`.
    #[must_use]
    pub fn from_new(id: i64, incident: NewIncident, now: DateTime<Utc>) -> Self {
        Self {
            id,
            offense: incident.offense,
            report_dat: incident.report_dat,
            start_date: incident.start_date,
            end_date: incident.end_date,
            shift: incident.shift,
            method: incident.method,
            ward: incident.ward,
            psa: incident.psa,
            neighborhood_cluster: incident.neighborhood_cluster,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the raw value of a categorical field.
    #[must_use]
    pub fn field(&self, field: IncidentField) -> Option<&str> {
        match field {
            IncidentField::Offense => self.offense.as_deref(),
            IncidentField::Shift => self.shift.as_deref(),
            IncidentField::Method => self.method.as_deref(),
            IncidentField::Ward => self.ward.as_deref(),
            IncidentField::Psa => self.psa.as_deref(),
            IncidentField::NeighborhoodCluster => self.neighborhood_cluster.as_deref(),
        }
    }

    /// Applies a partial update in place and bumps `updated_at`.
    pub fn apply(&mut self, patch: &IncidentPatch, now: DateTime<Utc>) {
        fn set<T: Clone>(slot: &mut Option<T>, change: Option<&Option<T>>) {
            if let Some(value) = change {
                slot.clone_from(value);
            }
        }

        set(&mut self.offense, patch.offense.as_ref());
        set(&mut self.report_dat, patch.report_dat.as_ref());
        set(&mut self.start_date, patch.start_date.as_ref());
        set(&mut self.end_date, patch.end_date.as_ref());
        set(&mut self.shift, patch.shift.as_ref());
        set(&mut self.method, patch.method.as_ref());
        set(&mut self.ward, patch.ward.as_ref());
        set(&mut self.psa, patch.psa.as_ref());
        set(&mut self.neighborhood_cluster, patch.neighborhood_cluster.as_ref());
        self.updated_at = now;
    }
}

/// An incident that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Offense category.
    #[serde(default, rename = "OFFENSE")]
    pub offense: Option<String>,
    /// When the incident was reported.
    #[serde(default, rename = "REPORT_DAT")]
    pub report_dat: Option<DateTime<Utc>>,
    /// Start of the incident window.
    #[serde(default, rename = "START_DATE")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the incident window.
    #[serde(default, rename = "END_DATE")]
    pub end_date: Option<DateTime<Utc>>,
    /// Police shift.
    #[serde(default, rename = "SHIFT")]
    pub shift: Option<String>,
    /// Method.
    #[serde(default, rename = "METHOD")]
    pub method: Option<String>,
    /// Ward.
    #[serde(default, rename = "WARD")]
    pub ward: Option<String>,
    /// Police service area.
    #[serde(default, rename = "PSA")]
    pub psa: Option<String>,
    /// Neighborhood cluster.
    #[serde(default, rename = "NEIGHBORHOOD_CLUSTER")]
    pub neighborhood_cluster: Option<String>,
}

/// A partial update to a stored incident.
///
/// Each field is `None` when the key was omitted (leave unchanged),
/// `Some(None)` when it was explicitly `null` (clear), and `Some(Some(v))`
/// when a new value was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncidentPatch {
    /// Offense category.
    #[serde(default, rename = "OFFENSE", deserialize_with = "present")]
    pub offense: Option<Option<String>>,
    /// When the incident was reported.
    #[serde(default, rename = "REPORT_DAT", deserialize_with = "present")]
    pub report_dat: Option<Option<DateTime<Utc>>>,
    /// Start of the incident window.
    #[serde(default, rename = "START_DATE", deserialize_with = "present")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    /// End of the incident window.
    #[serde(default, rename = "END_DATE", deserialize_with = "present")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    /// Police shift.
    #[serde(default, rename = "SHIFT", deserialize_with = "present")]
    pub shift: Option<Option<String>>,
    /// Method.
    #[serde(default, rename = "METHOD", deserialize_with = "present")]
    pub method: Option<Option<String>>,
    /// Ward.
    #[serde(default, rename = "WARD", deserialize_with = "present")]
    pub ward: Option<Option<String>>,
    /// Police service area.
    #[serde(default, rename = "PSA", deserialize_with = "present")]
    pub psa: Option<Option<String>>,
    /// Neighborhood cluster.
    #[serde(default, rename = "NEIGHBORHOOD_CLUSTER", deserialize_with = "present")]
    pub neighborhood_cluster: Option<Option<String>>,
}

/// Marks a key as present so that an explicit `null` is distinguishable
/// from an omitted key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn record() -> IncidentRecord {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        IncidentRecord::from_new(
            7,
            NewIncident {
                offense: Some("THEFT/OTHER".to_string()),
                shift: Some("DAY".to_string()),
                ward: Some("2".to_string()),
                ..NewIncident::default()
            },
            now,
        )
    }

    #[test]
    fn field_names_match_dataset_columns() {
        assert_eq!(IncidentField::Offense.to_string(), "OFFENSE");
        assert_eq!(
            IncidentField::NeighborhoodCluster.as_ref(),
            "NEIGHBORHOOD_CLUSTER"
        );
        assert_eq!("PSA".parse::<IncidentField>().unwrap(), IncidentField::Psa);
        assert!("COLOR".parse::<IncidentField>().is_err());
    }

    #[test]
    fn field_lookup_reads_matching_column() {
        let record = record();
        assert_eq!(record.field(IncidentField::Offense), Some("THEFT/OTHER"));
        assert_eq!(record.field(IncidentField::Ward), Some("2"));
        assert_eq!(record.field(IncidentField::Method), None);
    }

    #[test]
    fn patch_distinguishes_null_from_omitted() {
        let patch: IncidentPatch =
            serde_json::from_str(r#"{"SHIFT":"EVENING","WARD":null}"#).unwrap();
        assert_eq!(patch.shift, Some(Some("EVENING".to_string())));
        assert_eq!(patch.ward, Some(None));
        assert_eq!(patch.offense, None);

        let mut record = record();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        record.apply(&patch, later);

        assert_eq!(record.shift.as_deref(), Some("EVENING"));
        assert_eq!(record.ward, None);
        assert_eq!(record.offense.as_deref(), Some("THEFT/OTHER"));
        assert_eq!(record.updated_at, later);
        assert!(record.created_at < later);
    }

    #[test]
    fn empty_patch_changes_nothing_but_the_timestamp() {
        let patch: IncidentPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch, IncidentPatch::default());

        let mut updated = record();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        updated.apply(&patch, later);
        assert_eq!(updated.updated_at, later);
        updated.updated_at = record().updated_at;
        assert_eq!(updated, record());
    }

    #[test]
    fn blank_values_are_whitespace_only() {
        assert!(is_blank(""));
        assert!(is_blank("  "));
        assert!(is_blank("\t\r\n "));
        assert!(!is_blank(" 7 "));
        assert!(!is_blank("UNKNOWN"));
    }

    #[test]
    fn new_incident_accepts_iso_timestamps() {
        let incident: NewIncident = serde_json::from_str(
            r#"{"OFFENSE":"TEST_OFFENSE","REPORT_DAT":"2025-01-15T12:34:56.000Z","WARD":"2"}"#,
        )
        .unwrap();
        assert_eq!(
            incident.report_dat,
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 34, 56).unwrap())
        );
        assert_eq!(incident.method, None);
    }
}
