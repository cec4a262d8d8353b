//! Timezone resolution and offset arithmetic over the IANA database.

use chrono::{DateTime, Duration, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz, TZ_VARIANTS};

use crate::mcp::tool::ToolError;

/// Common abbreviations accepted in place of IANA names.
const ABBREVIATIONS: [(&str, &str); 9] = [
    ("JST", "Asia/Tokyo"),
    ("EST", "America/New_York"),
    ("PST", "America/Los_Angeles"),
    ("GMT", "Europe/London"),
    ("CET", "Europe/Paris"),
    ("CST", "America/Chicago"),
    ("MST", "America/Denver"),
    ("AEST", "Australia/Sydney"),
    ("IST", "Asia/Kolkata"),
];

const MAX_SUGGESTIONS: usize = 5;

// Far enough to find the next yearly DST change for any zone
const TRANSITION_SEARCH_DAYS: i64 = 400;

/// Maps a known abbreviation to its IANA zone, otherwise returns the input.
#[must_use]
pub fn normalize(input: &str) -> &str {
    let upper = input.trim().to_uppercase();
    ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == upper)
        .map_or_else(|| input.trim(), |(_, zone)| *zone)
}

/// Resolves a zone name or abbreviation.
///
/// # Errors
///
/// Returns a `TIMEZONE_ERROR` failure with up to five similar zone names.
pub fn resolve(input: &str) -> Result<Tz, ToolError> {
    normalize(input)
        .parse::<Tz>()
        .map_err(|_| ToolError::invalid_timezone(input, suggestions(input)))
}

/// Zone names containing `input` (case-insensitive), comma separated.
#[must_use]
pub fn suggestions(input: &str) -> String {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return "No similar timezones found".to_string();
    }

    let matches: Vec<&str> = TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| name.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect();

    if matches.is_empty() {
        "No similar timezones found".to_string()
    } else {
        matches.join(", ")
    }
}

/// Total UTC offset in seconds at the given instant.
#[must_use]
pub fn offset_seconds(tz: Tz, instant: DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
}

/// Daylight-saving component of the offset in seconds.
#[must_use]
pub fn dst_seconds(dt: &DateTime<Tz>) -> i64 {
    dt.offset().dst_offset().num_seconds()
}

/// Standard (non-DST) offset in seconds.
#[must_use]
pub fn standard_offset_seconds(dt: &DateTime<Tz>) -> i64 {
    dt.offset().base_utc_offset().num_seconds()
}

/// Formats an offset as `+HH:MM` (`Z` for zero, `+HH:MM:SS` for odd seconds).
#[must_use]
pub fn format_offset(seconds: i64) -> String {
    if seconds == 0 {
        return "Z".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (hours, minutes, secs) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if secs == 0 {
        format!("{sign}{hours:02}:{minutes:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{secs:02}")
    }
}

/// Formats a span as an ISO-8601 duration such as `PT1H` or `PT5H30M`.
#[must_use]
pub fn iso_duration(seconds: i64) -> String {
    if seconds == 0 {
        return "PT0S".to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    let mut out = format!("PT{sign}");
    for (value, unit) in [(abs / 3600, 'H'), ((abs % 3600) / 60, 'M'), (abs % 60, 'S')] {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    out
}

/// Direction of an offset change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Clocks move forward (a local-time gap).
    SpringForward,
    /// Clocks move back (a local-time overlap).
    FallBack,
}

impl TransitionKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpringForward => "SPRING_FORWARD",
            Self::FallBack => "FALL_BACK",
        }
    }
}

/// An offset change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// First instant at which the new offset applies.
    pub at: DateTime<Utc>,
    /// Offset before, in seconds.
    pub offset_before: i32,
    /// Offset after, in seconds.
    pub offset_after: i32,
}

impl Transition {
    /// Whether the change opens a gap or an overlap.
    #[must_use]
    pub const fn kind(&self) -> TransitionKind {
        if self.offset_after > self.offset_before {
            TransitionKind::SpringForward
        } else {
            TransitionKind::FallBack
        }
    }
}

/// The next offset change strictly after `after`, if one occurs within about a year.
#[must_use]
pub fn next_transition(tz: Tz, after: DateTime<Utc>) -> Option<Transition> {
    let start_offset = offset_seconds(tz, after);
    let step = Duration::days(1);

    let mut low = after;
    for _ in 0..TRANSITION_SEARCH_DAYS {
        let high = low + step;
        if offset_seconds(tz, high) != start_offset {
            return Some(bisect(tz, low, high, start_offset));
        }
        low = high;
    }
    None
}

// Narrows [low, high] to the first whole second carrying a different offset
fn bisect(tz: Tz, low: DateTime<Utc>, high: DateTime<Utc>, before: i32) -> Transition {
    let at = |secs: i64| DateTime::from_timestamp(secs, 0).unwrap_or(high);
    let (mut low, mut high_secs) = (low.timestamp(), high.timestamp());
    while high_secs - low > 1 {
        let mid = low + (high_secs - low) / 2;
        if offset_seconds(tz, at(mid)) == before {
            low = mid;
        } else {
            high_secs = mid;
        }
    }
    let instant = at(high_secs);
    Transition {
        at: instant,
        offset_before: before,
        offset_after: offset_seconds(tz, instant),
    }
}

/// Whether the zone's offset never changes within the search window.
#[must_use]
pub fn has_fixed_offset(tz: Tz, from: DateTime<Utc>) -> bool {
    next_transition(tz, from).is_none()
}
