//! Timestamp rendering shared by the time tools.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// ISO-8601 with offset, fractional seconds only when present (`Z` for UTC).
#[must_use]
pub fn iso8601(dt: &DateTime<Tz>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// RFC 3339 truncated to whole seconds.
#[must_use]
pub fn rfc3339(dt: &DateTime<Tz>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `2024-01-15 10:30:00 JST`.
#[must_use]
pub fn human(dt: &DateTime<Tz>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// An instant in UTC, whole seconds.
#[must_use]
pub fn utc_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whether `pattern` is a well-formed strftime pattern.
#[must_use]
pub fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Renders with a strftime pattern, or `None` if the pattern is malformed.
#[must_use]
pub fn strftime<Z: TimeZone>(dt: &DateTime<Z>, pattern: &str) -> Option<String>
where
    Z::Offset: std::fmt::Display,
{
    if !is_valid_pattern(pattern) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(StrftimeItems::new(pattern))).ok()?;
    Some(out)
}

/// Upper-case English weekday, e.g. `MONDAY`.
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}
