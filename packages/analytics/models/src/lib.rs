#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Group keys, temporal features and answer shapes for the crime question
//! catalog.
//!
//! A [`GroupKey`] says how to bucket incidents: by the raw value of a
//! categorical column or by a calendar feature of the report timestamp.
//! [`tally`] performs the partition-and-count step in memory; stores that
//! can aggregate natively produce the same [`GroupCount`] set themselves.

pub mod temporal;

use std::collections::BTreeMap;

use crime_insights_incident_models::{IncidentField, IncidentRecord, is_blank};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use temporal::{TemporalFeature, Weekday};

/// Label of the bucket that collects records with no value for a raw field.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// How records are partitioned into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// The raw value of a categorical column. Missing or blank values are
    /// bucketed under [`UNKNOWN_LABEL`].
    Field(IncidentField),
    /// A calendar feature of `REPORT_DAT`. Records without a report
    /// timestamp are dropped.
    Feature(TemporalFeature),
}

impl GroupKey {
    /// Returns the group a record falls into, or `None` if the record is
    /// excluded from this grouping.
    #[must_use]
    pub fn extract(self, record: &IncidentRecord) -> Option<GroupValue> {
        match self {
            Self::Field(field) => Some(GroupValue::label_or_unknown(record.field(field))),
            Self::Feature(feature) => feature
                .extract_opt(record.report_dat.as_ref())
                .map(GroupValue::Number),
        }
    }

    /// Returns `true` if this key derives a calendar feature.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Feature(_))
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{field}"),
            Self::Feature(feature) => write!(f, "{feature}"),
        }
    }
}

/// The value identifying one group.
///
/// Ordering is numeric for temporal features and lexical for labels; it is
/// the secondary sort key when two groups have the same count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    /// A derived calendar component.
    Number(i32),
    /// A raw field value.
    Label(String),
}

impl GroupValue {
    /// Builds a label group, mapping absent and blank values to
    /// [`UNKNOWN_LABEL`].
    #[must_use]
    pub fn label_or_unknown(value: Option<&str>) -> Self {
        match value {
            Some(value) if !is_blank(value) => Self::Label(value.to_string()),
            _ => Self::Label(UNKNOWN_LABEL.to_string()),
        }
    }

    /// Returns the numeric value, if this is a temporal group.
    #[must_use]
    pub const fn as_number(&self) -> Option<i32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(_) => None,
        }
    }

    /// Returns the group's label as text.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Label(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for GroupValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => write!(f, "{s}"),
        }
    }
}

/// A group and the number of records in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupCount {
    /// The group value.
    pub key: GroupValue,
    /// Number of records in the group.
    pub count: u64,
}

impl GroupCount {
    /// Creates a new group count.
    #[must_use]
    pub const fn new(key: GroupValue, count: u64) -> Self {
        Self { key, count }
    }
}

/// Partitions `records` by `key` and counts each group.
///
/// Output is ordered by group value, not by count; ranking is a separate
/// step.
pub fn tally<'a, I>(records: I, key: GroupKey) -> Vec<GroupCount>
where
    I: IntoIterator<Item = &'a IncidentRecord>,
{
    let mut counts: BTreeMap<GroupValue, u64> = BTreeMap::new();

    for record in records {
        if let Some(value) = key.extract(record) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect()
}

/// A group count with its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupShare {
    /// The group value.
    pub key: GroupValue,
    /// Number of records in the group.
    pub count: u64,
    /// Percentage of all records, rounded to two decimals.
    pub percent: f64,
}

/// The fixed questions the catalog answers.
///
/// The string form is the URL slug used by the API and the CLI.
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
pub enum Question {
    /// Five most frequent offenses in a year.
    #[serde(rename = "top5-offense-2025")]
    #[strum(serialize = "top5-offense-2025")]
    TopOffenses,
    /// Weekday with the most reports.
    #[serde(rename = "most-common-weekday")]
    #[strum(serialize = "most-common-weekday")]
    MostCommonWeekday,
    /// Hour with the most reports.
    #[serde(rename = "busiest-hour")]
    #[strum(serialize = "busiest-hour")]
    BusiestHour,
    /// Ward with the most incidents.
    #[serde(rename = "top-ward")]
    #[strum(serialize = "top-ward")]
    TopWard,
    /// PSA with the most incidents.
    #[serde(rename = "top-psa")]
    #[strum(serialize = "top-psa")]
    TopPsa,
    /// Share of incidents per method.
    #[serde(rename = "method-fractions")]
    #[strum(serialize = "method-fractions")]
    MethodFractions,
    /// Incident counts per shift.
    #[serde(rename = "shift-comparison")]
    #[strum(serialize = "shift-comparison")]
    ShiftComparison,
    /// Month with the most reports.
    #[serde(rename = "top-month")]
    #[strum(serialize = "top-month")]
    TopMonth,
}

/// Year the offense ranking targets when none is given.
pub const DEFAULT_OFFENSE_YEAR: i32 = 2025;

impl Question {
    /// Returns all questions in catalog order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TopOffenses,
            Self::MostCommonWeekday,
            Self::BusiestHour,
            Self::TopWard,
            Self::TopPsa,
            Self::MethodFractions,
            Self::ShiftComparison,
            Self::TopMonth,
        ]
    }

    /// Returns the question text. `year` only affects
    /// [`Question::TopOffenses`].
    #[must_use]
    pub fn text(self, year: i32) -> String {
        match self {
            Self::TopOffenses => {
                format!("Which five OFFENSE categories occurred most frequently in {year}?")
            }
            Self::MostCommonWeekday => {
                "On which day of the week are incidents most common (based on REPORT_DAT)?"
                    .to_string()
            }
            Self::BusiestHour => "What is the busiest hour for reported incidents?".to_string(),
            Self::TopWard => "Which WARD has the highest number of incidents?".to_string(),
            Self::TopPsa => "Which PSA records the most incidents?".to_string(),
            Self::MethodFractions => {
                "What fraction of incidents involve each METHOD (percent by METHOD)?".to_string()
            }
            Self::ShiftComparison => "How do incident counts compare across SHIFT \
                 (Day/Evening/Midnight), and which is highest?"
                .to_string(),
            Self::TopMonth => {
                "Which month has the most reported incidents (by REPORT_DAT)?".to_string()
            }
        }
    }
}

/// One row of the top-offenses answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffenseCount {
    /// Offense label.
    pub offense: String,
    /// Number of incidents.
    pub count: u64,
}

/// The most common weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayCount {
    /// Weekday name.
    pub weekday: Weekday,
    /// Number of incidents.
    pub count: u64,
}

/// The busiest hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    /// Hour of day, 0-23.
    pub hour: i32,
    /// Number of incidents.
    pub count: u64,
}

/// The ward with the most incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardCount {
    /// Ward label.
    #[serde(rename = "WARD")]
    pub ward: String,
    /// Number of incidents.
    pub count: u64,
}

/// The PSA with the most incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsaCount {
    /// PSA label.
    #[serde(rename = "PSA")]
    pub psa: String,
    /// Number of incidents.
    pub count: u64,
}

/// One row of the method distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodShare {
    /// Method label.
    #[serde(rename = "METHOD")]
    pub method: String,
    /// Number of incidents.
    pub count: u64,
    /// Percentage of all incidents.
    pub percent: f64,
}

/// One row of the shift comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCount {
    /// Shift label.
    #[serde(rename = "SHIFT")]
    pub shift: String,
    /// Number of incidents.
    pub count: u64,
}

/// The month with the most reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    /// Month, January = 1.
    pub month: i32,
    /// Number of incidents.
    pub count: u64,
}

/// The answer to one catalog question.
///
/// Serializes untagged: single-result questions become an object or
/// `null`, list questions become an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Ranked offenses.
    TopOffenses(Vec<OffenseCount>),
    /// Top weekday, if any records have a report timestamp.
    MostCommonWeekday(Option<WeekdayCount>),
    /// Top hour, if any records have a report timestamp.
    BusiestHour(Option<HourCount>),
    /// Top ward, if any records have a ward.
    TopWard(Option<WardCount>),
    /// Top PSA, if any records have a PSA.
    TopPsa(Option<PsaCount>),
    /// Every method with its share.
    MethodFractions(Vec<MethodShare>),
    /// Every shift with its count.
    ShiftComparison(Vec<ShiftCount>),
    /// Top month, if any records have a report timestamp.
    TopMonth(Option<MonthCount>),
}

/// A question together with its answer, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResponse {
    /// The question text.
    pub question: String,
    /// The computed answer.
    pub answer: Answer,
}
