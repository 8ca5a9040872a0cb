//! Timestamp utilities shared by the store, tracker, and domain model.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// # Examples
///
/// ```
/// use devflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00") || ts.ends_with("Z"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_parses_as_rfc3339() {
        let ts = iso_timestamp();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_now_utc_is_monotonic_enough() {
        let a = now_utc();
        let b = now_utc();
        assert!(b >= a);
    }
}
