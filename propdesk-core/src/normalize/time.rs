//! Timestamp coercion for raw trade payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Unix values above this are taken as milliseconds (10^11 s is year 5138).
const MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];

/// Parse a JSON value into a UTC timestamp.
///
/// Accepts RFC 3339 strings, a handful of naive formats (read as UTC), bare
/// dates (midnight UTC) and Unix seconds or milliseconds as numbers or
/// numeric strings. Returns `None` for anything else.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_unix),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

pub(crate) fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    s.parse::<f64>().ok().and_then(from_unix)
}

fn from_unix(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value > MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp(&json!("2024-03-04T11:30:00+02:00")).unwrap();
        assert_eq!(ts, expected());
    }

    #[test]
    fn parses_naive_formats_as_utc() {
        for s in [
            "2024-03-04 09:30:00",
            "2024-03-04T09:30:00",
            "2024.03.04 09:30:00",
            "2024.03.04 09:30",
            "2024/03/04 09:30:00",
        ] {
            assert_eq!(parse_timestamp(&json!(s)), Some(expected()), "format {s}");
        }
    }

    #[test]
    fn parses_fractional_seconds() {
        let ts = parse_timestamp(&json!("2024-03-04 09:30:00.250")).unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let ts = parse_timestamp(&json!("2024-03-04")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_unix_seconds_and_millis() {
        let secs = expected().timestamp();
        assert_eq!(parse_timestamp(&json!(secs)), Some(expected()));
        assert_eq!(parse_timestamp(&json!(secs * 1000)), Some(expected()));
        assert_eq!(parse_timestamp(&json!(secs.to_string())), Some(expected()));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!("")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&json!(-5)), None);
        assert_eq!(parse_timestamp(&Value::Null), None);
    }
}
