//! Lenient parsing for caller-supplied timestamps.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Naive date-time layouts accepted after RFC 3339 fails; interpreted as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Years that render as four digits, keeping `sortable` in chronological order.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// Parse a timestamp string, accepting the ISO-8601 shapes browsers and
/// scripts commonly send. Returns `None` when nothing matches or the year is
/// outside 0000-9999.
pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    parse_any(raw.trim()).filter(|parsed| YEAR_RANGE.contains(&parsed.year()))
}

fn parse_any(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse `raw`, falling back to `now` when it cannot be understood.
pub fn resolve_timestamp(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_lenient(raw).unwrap_or(now)
}

/// Fixed-width RFC 3339 rendering; lexical order matches chronological order.
pub fn sortable(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
