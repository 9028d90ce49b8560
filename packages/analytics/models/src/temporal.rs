//! Calendar features derived from incident timestamps.
//!
//! Features are read from the stored instant's calendar components as-is.
//! Timestamps are stored in UTC and no timezone conversion is applied, so
//! the hour of an incident reported at `2025-03-01T23:30:00Z` is 23 no
//! matter where the server runs.

use chrono::{DateTime, Datelike as _, Timelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A calendar component computed from a stored instant.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemporalFeature {
    /// Four-digit calendar year.
    Year,
    /// Month of the year, January = 1.
    Month,
    /// Day of the week, Sunday = 0 through Saturday = 6.
    DayOfWeek,
    /// Hour of the day, 0-23.
    Hour,
}

impl TemporalFeature {
    /// Extracts this feature from an instant.
    ///
    /// Month, weekday and hour are all below 24 so the casts are lossless.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn extract(self, instant: &DateTime<Utc>) -> i32 {
        match self {
            Self::Year => instant.year(),
            Self::Month => instant.month() as i32,
            Self::DayOfWeek => instant.weekday().num_days_from_sunday() as i32,
            Self::Hour => instant.hour() as i32,
        }
    }

    /// Extracts this feature from an optional instant.
    ///
    /// Returns `None` when the instant is absent. Callers grouping by a
    /// temporal feature drop such records rather than bucketing them.
    #[must_use]
    pub fn extract_opt(self, instant: Option<&DateTime<Utc>>) -> Option<i32> {
        instant.map(|instant| self.extract(instant))
    }
}

/// Returns `true` when `instant` is present and falls in calendar `year`.
///
/// This compares the extracted year component for equality instead of
/// checking a date range.
#[must_use]
pub fn in_year(instant: Option<&DateTime<Utc>>, year: i32) -> bool {
    TemporalFeature::Year.extract_opt(instant) == Some(year)
}

/// Canonical weekday labels, indexed from Sunday.
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
pub enum Weekday {
    /// Index 0.
    Sunday,
    /// Index 1.
    Monday,
    /// Index 2.
    Tuesday,
    /// Index 3.
    Wednesday,
    /// Index 4.
    Thursday,
    /// Index 5.
    Friday,
    /// Index 6.
    Saturday,
}

impl Weekday {
    /// Maps a [`TemporalFeature::DayOfWeek`] value to its label.
    ///
    /// Returns `None` for values outside `0..=6`.
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Sunday),
            1 => Some(Self::Monday),
            2 => Some(Self::Tuesday),
            3 => Some(Self::Wednesday),
            4 => Some(Self::Thursday),
            5 => Some(Self::Friday),
            6 => Some(Self::Saturday),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn extracts_calendar_components_without_conversion() {
        // 2025-03-01 is a Saturday.
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(TemporalFeature::Year.extract(&instant), 2025);
        assert_eq!(TemporalFeature::Month.extract(&instant), 3);
        assert_eq!(TemporalFeature::DayOfWeek.extract(&instant), 6);
        assert_eq!(TemporalFeature::Hour.extract(&instant), 23);
    }

    #[test]
    fn sunday_is_day_zero_and_january_is_month_one() {
        let instant = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(TemporalFeature::DayOfWeek.extract(&instant), 0);
        assert_eq!(TemporalFeature::Month.extract(&instant), 1);
        assert_eq!(TemporalFeature::Hour.extract(&instant), 0);
    }

    #[test]
    fn absent_instant_yields_no_feature() {
        assert_eq!(TemporalFeature::Hour.extract_opt(None), None);
        assert!(!in_year(None, 2025));
    }

    #[test]
    fn year_match_is_exact_at_boundaries() {
        let last = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(!in_year(Some(&last), 2025));
        assert!(in_year(Some(&first), 2025));
    }

    #[test]
    fn weekday_labels_round_trip_through_index() {
        for index in 0..7 {
            let day = Weekday::from_index(index).unwrap();
            assert_eq!(day as i32, index);
        }
        assert_eq!(Weekday::from_index(0).unwrap().to_string(), "Sunday");
        assert_eq!(Weekday::from_index(6).unwrap().to_string(), "Saturday");
        assert_eq!(Weekday::from_index(7), None);
        assert_eq!(Weekday::from_index(-1), None);
    }
}
