//! Permissive date parsing for frontend-supplied strings.
//!
//! JavaScript clients send dates in whatever shape their serializer
//! produces, so parsing tries a ladder of common formats rather than a
//! single strict one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a date from any of the accepted formats.
///
/// Datetime-shaped input is accepted and truncated to its date part.
pub fn parse_date_permissive(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    parse_datetime_permissive(raw).map(|dt| dt.date())
}

/// Parses a datetime from any of the accepted formats.
///
/// RFC 3339 timestamps are normalized to naive UTC. Bare dates parse
/// with a midnight time component.
pub fn parse_datetime_permissive(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date_permissive("2024-03-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_parse_date_us_style() {
        let date = parse_date_permissive("03/15/2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_parse_date_from_datetime_string() {
        let date = parse_date_permissive("2024-03-15T10:30:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime_permissive("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 10:30:00");
    }

    #[test]
    fn test_parse_datetime_space_separated() {
        assert!(parse_datetime_permissive("2024-03-15 10:30:00").is_some());
    }

    #[test]
    fn test_parse_datetime_from_bare_date() {
        let dt = parse_datetime_permissive("2024-03-15").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 00:00:00");
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_date_permissive("not a date").is_none());
        assert!(parse_datetime_permissive("15th of March").is_none());
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert!(parse_date_permissive("  2024-03-15  ").is_some());
    }
}
