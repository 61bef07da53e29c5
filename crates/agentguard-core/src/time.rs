//! Canonical timestamp formatting for persisted rows.
//!
//! All persisted timestamps use one fixed-width ISO-8601 UTC layout so
//! window queries can compare strings lexicographically.

use chrono::{DateTime, Duration, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format an instant in the canonical persisted layout.
pub fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.format(ISO_FORMAT).to_string()
}

/// Current time in the canonical persisted layout.
pub fn utc_now_iso() -> String {
    iso_utc(Utc::now())
}

/// Window cutoff `hours` ago, in the canonical persisted layout.
pub fn iso_hours_ago(hours: i64) -> String {
    iso_utc(Utc::now() - Duration::hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 6).unwrap();
        let a = iso_utc(early);
        let b = iso_utc(late);
        assert_eq!(a.len(), b.len());
        assert!(a < b, "lexicographic order must follow time order");
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn cutoff_precedes_now() {
        assert!(iso_hours_ago(1) < utc_now_iso());
    }
}
