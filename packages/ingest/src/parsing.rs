//! Normalization of raw dataset values.
//!
//! The DC feeds are loosely typed: the same column may arrive as a string
//! in one export and a number in another, and timestamps come as epoch
//! milliseconds (`ArcGIS`), ISO 8601, or DC's `YYYY/MM/DD HH:MM:SS+00`
//! form (`GeoJSON` download).

use chrono::{DateTime, NaiveDateTime, Utc};
use crime_insights_incident_models::is_blank;
use serde_json::Value;

/// Naive formats tried after RFC 3339 and the offset-bearing DC form.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses an epoch-millisecond timestamp to a UTC datetime.
#[must_use]
pub fn parse_epoch_ms(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = ms as i64;
    DateTime::from_timestamp_millis(millis)
}

/// Parses a textual timestamp. Naive values are taken to be UTC.
#[must_use]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S%#z") {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a timestamp from a JSON number (epoch ms) or string.
#[must_use]
pub fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => n.as_f64().and_then(parse_epoch_ms),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Reads a categorical value as text.
///
/// Numbers are stringified so `WARD: 2` and `WARD: "2"` land in the same
/// group. Blank strings and non-scalar values become `None`.
#[must_use]
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !is_blank(s) => Some(s.clone()),
        Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| n.to_string(), |i| i.to_string()),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use serde_json::json;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn parses_epoch_milliseconds() {
        let dt = parse_epoch_ms(1_741_385_700_000.0).unwrap();
        assert_eq!(dt, utc(2025, 3, 7, 22, 15, 0));
        assert!(parse_epoch_ms(f64::NAN).is_none());
    }

    #[test]
    fn parses_dc_geojson_timestamp() {
        assert_eq!(
            parse_timestamp_str("2025/03/07 22:15:00+00").unwrap(),
            utc(2025, 3, 7, 22, 15, 0)
        );
    }

    #[test]
    fn parses_iso_timestamps() {
        assert_eq!(
            parse_timestamp_str("2025-03-07T22:15:00.000Z").unwrap(),
            utc(2025, 3, 7, 22, 15, 0)
        );
        assert_eq!(
            parse_timestamp_str("2025-03-07T17:15:00-05:00").unwrap(),
            utc(2025, 3, 7, 22, 15, 0)
        );
        assert_eq!(
            parse_timestamp_str("2025-03-07T22:15:00").unwrap(),
            utc(2025, 3, 7, 22, 15, 0)
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp_str("").is_none());
        assert!(parse_timestamp_str("yesterday").is_none());
        assert!(timestamp(Some(&json!(true))).is_none());
        assert!(timestamp(Some(&Value::Null)).is_none());
        assert!(timestamp(None).is_none());
    }

    #[test]
    fn stringifies_numeric_categories() {
        assert_eq!(text(Some(&json!(2))), Some("2".to_string()));
        assert_eq!(text(Some(&json!("2"))), Some("2".to_string()));
        assert_eq!(text(Some(&json!(1.5))), Some("1.5".to_string()));
    }

    #[test]
    fn blank_and_missing_categories_are_none() {
        assert!(text(Some(&json!(""))).is_none());
        assert!(text(Some(&json!("   "))).is_none());
        assert!(text(Some(&json!("\t\n"))).is_none());
        assert!(text(Some(&Value::Null)).is_none());
        assert!(text(None).is_none());
    }
}
