//! Timestamp handling.
//!
//! The tracker speaks a single UTC wire format, `YYYY-MM-DDTHH:MM:SSZ`.
//! Anything else is rejected rather than coerced.

use crate::error::{Result, ThreadsError};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Wire format used by the tracker and by the watermark store.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format used in rendered thread documents.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Parse a wire-format timestamp.
///
/// # Errors
///
/// Returns [`ThreadsError::Timestamp`] if `value` is not exactly in
/// [`WIRE_FORMAT`].
pub fn parse_wire(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, WIRE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ThreadsError::Timestamp {
            value: value.to_string(),
        })
}

#[must_use]
pub fn format_wire(value: &DateTime<Utc>) -> String {
    value.format(WIRE_FORMAT).to_string()
}

#[must_use]
pub fn format_display(value: &DateTime<Utc>) -> String {
    value.format(DISPLAY_FORMAT).to_string()
}

/// Serde adapter for `DateTime<Utc>` fields stored in wire format.
pub mod wire {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_wire(value))
    }

    /// # Errors
    ///
    /// Fails when the string is not in the wire format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wire(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_wire_format() {
        let parsed = parse_wire("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn display_format_matches_thread_header() {
        let value = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(format_display(&value), "2024-03-05 14:07:09 UTC");
        assert_eq!(format_wire(&value), "2024-03-05T14:07:09Z");
    }

    #[test]
    fn rejects_other_formats() {
        for value in [
            "2024-01-01 00:00:00",
            "2024-01-01T00:00:00+00:00",
            "2024-01-01T00:00:00.123Z",
            "2024-01-01",
            "",
        ] {
            let err = parse_wire(value).unwrap_err();
            assert!(
                matches!(err, ThreadsError::Timestamp { .. }),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn wire_order_matches_chronological_order() {
        let earlier = parse_wire("2023-12-31T23:59:59Z").unwrap();
        let later = parse_wire("2024-01-01T00:00:00Z").unwrap();
        assert!(earlier < later);
    }
}
