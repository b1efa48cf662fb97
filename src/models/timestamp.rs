//! Timestamp decoding for stored documents.
//!
//! Documents written by this service carry RFC 3339 timestamps with an offset.
//! Older documents in the same indices were written as naive ISO 8601 local
//! times (`2024-05-01T10:00:00.123456`); those are read as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse("2024-05-01T10:00:00Z"), Some(utc("2024-05-01T10:00:00Z")));
        assert_eq!(parse("2024-05-01T12:00:00+02:00"), Some(utc("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn test_parse_naive_as_utc() {
        assert_eq!(
            parse("2024-05-01T10:00:00.123456"),
            Some(utc("2024-05-01T10:00:00.123456Z"))
        );
        assert_eq!(parse("2024-05-01T10:00:00"), Some(utc("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse("2024-05-01"), None);
        assert_eq!(parse(""), None);
    }
}
