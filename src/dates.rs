//! Timestamp parsing, formatting and the modified-date plausibility rule.
//!
//! Sites publish dates in whatever shape their CMS emits: RFC 3339 with or
//! without offset, bare dates, space-separated datetimes, RFC 2822. All are
//! normalized to the wall-clock time written in the source and rendered as
//! `YYYY-MM-DD HH:MM:SS`. Offsets are dropped, not converted.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Canonical textual timestamp format of article records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default plausibility window in years.
pub const PLAUSIBILITY_YEARS: i64 = 10;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Parse a timestamp in any of the common CMS shapes.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_local());
    }
    None
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse and re-render `raw` in the canonical format.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|ts| format_timestamp(&ts))
}

/// A modified date is plausible unless it precedes the publish date by more
/// than `years` (counted as 365-day years).
///
/// A window reaching past the representable date range excludes nothing.
pub fn is_plausible(publish: &NaiveDateTime, modified: &NaiveDateTime, years: i64) -> bool {
    let earliest = years
        .checked_mul(365)
        .and_then(Duration::try_days)
        .and_then(|limit| publish.checked_sub_signed(limit));
    match earliest {
        Some(earliest) => *modified >= earliest,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, rng};

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(format_timestamp(&ts("2005-01-01")), "2005-01-01 00:00:00");
        assert_eq!(
            format_timestamp(&ts("2024-03-05T07:08:09+07:00")),
            "2024-03-05 07:08:09"
        );
        assert_eq!(
            format_timestamp(&ts("2024-03-05T07:08:09.123Z")),
            "2024-03-05 07:08:09"
        );
        assert_eq!(
            format_timestamp(&ts("2024-03-05T07:08:09+0700")),
            "2024-03-05 07:08:09"
        );
        assert_eq!(
            format_timestamp(&ts("2024-03-05 07:08:09")),
            "2024-03-05 07:08:09"
        );
        assert_eq!(format_timestamp(&ts("2024-03-05T07:08")), "2024-03-05 07:08:00");
        assert_eq!(
            format_timestamp(&ts("Tue, 05 Mar 2024 07:08:09 +0000")),
            "2024-03-05 07:08:09"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("kemarin sore").is_none());
        assert!(parse_timestamp("2024-13-45").is_none());
    }

    #[test]
    fn test_plausibility_boundaries() {
        let publish = ts("2023-01-01");
        assert!(!is_plausible(&publish, &ts("2005-01-01"), PLAUSIBILITY_YEARS));
        assert!(is_plausible(&publish, &ts("2022-12-31"), PLAUSIBILITY_YEARS));
        assert!(is_plausible(&publish, &ts("2024-06-01"), PLAUSIBILITY_YEARS));
        let edge = publish - Duration::days(3650);
        assert!(is_plausible(&publish, &edge, PLAUSIBILITY_YEARS));
        assert!(!is_plausible(
            &publish,
            &(edge - Duration::seconds(1)),
            PLAUSIBILITY_YEARS
        ));
    }

    #[test]
    fn test_plausibility_at_range_limits() {
        let extreme = ts("-262143-01-01 00:00:00");
        assert!(is_plausible(&extreme, &ts("2020-01-01"), PLAUSIBILITY_YEARS));
        assert!(is_plausible(&NaiveDateTime::MIN, &NaiveDateTime::MIN, PLAUSIBILITY_YEARS));
        assert!(is_plausible(&ts("2023-01-01"), &ts("1900-01-01"), i64::MAX));
        assert!(!is_plausible(&NaiveDateTime::MAX, &ts("2020-01-01"), PLAUSIBILITY_YEARS));
    }

    #[test]
    fn test_plausibility_random_pairs() {
        let mut r = rng();
        let base = ts("2000-01-01");
        for _ in 0..2_000 {
            let publish = base + Duration::seconds(r.random_range(0..(40 * 365 * 86_400)));
            let offset = r.random_range(-(30 * 365 * 86_400)..(5 * 365 * 86_400));
            let modified = publish + Duration::seconds(offset);
            let expected = offset >= -(PLAUSIBILITY_YEARS * 365 * 86_400);
            assert_eq!(is_plausible(&publish, &modified, PLAUSIBILITY_YEARS), expected);
        }
    }
}
