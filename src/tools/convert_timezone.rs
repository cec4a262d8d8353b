//! `convert_timezone`: one instant shown in one or many zones.

use std::sync::Arc;

use chrono::{DateTime, Datelike, LocalResult, Months, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use indexmap::IndexSet;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::mcp::params::{bool_or, optional_i64, optional_object, optional_str, str_list};
use crate::mcp::protocol::{JsonRpcError, Params};
use crate::mcp::schema::{ParameterSchema, PropertySchema, SchemaType};
use crate::mcp::tool::{Tool, ToolError, ToolResponse};
use crate::services::clock::Clock;
use crate::services::zones;
use crate::tools::format;

/// Patterns tried, in order, for datetimes without an offset.
const NAIVE_PATTERNS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const RELATIVE_UNITS: [&str; 5] = ["MINUTES", "HOURS", "DAYS", "WEEKS", "MONTHS"];

const CACHE_TTL_SECONDS: u64 = 300;

/// How converted datetimes are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputFormat {
    Iso8601,
    Unix,
    Pattern(String),
}

impl OutputFormat {
    // Malformed patterns fall back to ISO-8601
    fn parse(input: &str) -> Self {
        if input.eq_ignore_ascii_case("ISO8601") {
            Self::Iso8601
        } else if input.eq_ignore_ascii_case("UNIX") {
            Self::Unix
        } else if format::is_valid_pattern(input) {
            Self::Pattern(input.to_string())
        } else {
            Self::Iso8601
        }
    }

    fn render(&self, dt: &DateTime<Tz>) -> String {
        match self {
            Self::Iso8601 => format::iso8601(dt),
            Self::Unix => dt.timestamp().to_string(),
            Self::Pattern(pattern) => {
                format::strftime(dt, pattern).unwrap_or_else(|| format::iso8601(dt))
            }
        }
    }
}

/// Interprets a local wall-clock time in `zone`.
///
/// Overlaps resolve to the earlier offset; times in a gap move forward by the gap length.
fn localize(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => {
            let before = zone.offset_from_utc_datetime(&(naive - TimeDelta::days(1)));
            let offset = before.fix().local_minus_utc();
            let utc = naive - TimeDelta::seconds(i64::from(offset));
            Some(Utc.from_utc_datetime(&utc).with_timezone(&zone))
        }
    }
}

/// Parses the supported datetime spellings.
///
/// A string carrying its own offset keeps its instant and is re-expressed in `zone`.
fn parse_datetime(input: &str, zone: Tz) -> Option<DateTime<Tz>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&zone));
    }
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&zone));
    }

    for pattern in NAIVE_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return localize(zone, naive);
        }
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        let value: i64 = input.parse().ok()?;
        let instant = match input.len() {
            10 => DateTime::from_timestamp(value, 0)?,
            13 => DateTime::from_timestamp_millis(value)?,
            _ => return None,
        };
        return Some(instant.with_timezone(&zone));
    }
    None
}

fn shift(now: DateTime<Tz>, amount: i64, unit: &str) -> Option<DateTime<Tz>> {
    let delta = |d: Option<TimeDelta>| d.and_then(|d| now.checked_add_signed(d));
    match unit.to_uppercase().as_str() {
        "MINUTES" => delta(TimeDelta::try_minutes(amount)),
        "HOURS" => delta(TimeDelta::try_hours(amount)),
        "DAYS" => delta(TimeDelta::try_days(amount)),
        "WEEKS" => delta(TimeDelta::try_weeks(amount)),
        "MONTHS" => {
            let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
            if amount < 0 {
                now.checked_sub_months(months)
            } else {
                now.checked_add_months(months)
            }
        }
        // Unknown units leave the time unchanged
        _ => Some(now),
    }
}

/// `+9h`, `-3h30m`, `0h`.
fn format_difference(seconds: i32) -> String {
    if seconds == 0 {
        return "0h".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (hours, minutes) = (abs / 3600, (abs % 3600) / 60);
    if minutes == 0 {
        format!("{sign}{hours}h")
    } else {
        format!("{sign}{hours}h{minutes:02}m")
    }
}

fn offset_of(dt: &DateTime<Tz>) -> i32 {
    zones::offset_seconds(dt.timezone(), dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy)]
struct Options {
    include_dst_info: bool,
    include_time_difference: bool,
}

/// Converts an instant between IANA zones.
pub struct ConvertTimezone {
    clock: Arc<dyn Clock>,
}

impl ConvertTimezone {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn source_datetime(&self, params: &Params, zone: Tz) -> Result<DateTime<Tz>, ToolError> {
        let now = self.clock.now().with_timezone(&zone);

        if let Some(relative) = optional_object(params, "relative_time")?.filter(|r| !r.is_empty()) {
            let amount = optional_i64(relative, "amount")?;
            let unit = optional_str(relative, "unit")?;
            return match (amount, unit) {
                (Some(amount), Some(unit)) => shift(now, amount, unit).ok_or_else(|| {
                    ToolError::invalid_parameter("relative_time", "result is out of range")
                }),
                _ => Ok(now),
            };
        }

        match optional_str(params, "datetime")?.filter(|s| !s.trim().is_empty()) {
            None => Ok(now),
            Some(input) => parse_datetime(input, zone).ok_or_else(|| {
                ToolError::invalid_parameter("datetime", format!("Unable to parse datetime: {input}"))
            }),
        }
    }

    fn convert(
        source: &DateTime<Tz>,
        target: &str,
        output: &OutputFormat,
        options: Options,
    ) -> Result<Value, ToolError> {
        let zone = zones::resolve(target)?;
        let converted = source.with_timezone(&zone);
        let offset = offset_of(&converted);

        let mut result = Map::new();
        result.insert("datetime".into(), json!(output.render(&converted)));
        result.insert("timezone".into(), json!(zone.name()));
        result.insert("unix_timestamp".into(), json!(converted.timestamp()));
        result.insert("offset".into(), json!(zones::format_offset(i64::from(offset))));

        if options.include_time_difference {
            let difference = offset - offset_of(source);
            result.insert(
                "time_difference".into(),
                json!({
                    "offset_difference_seconds": difference,
                    "offset_difference_hours": f64::from(difference) / 3600.0,
                    "offset_difference": format_difference(difference),
                    "same_instant": true,
                }),
            );
        }

        if options.include_dst_info {
            let dst = zones::dst_seconds(&converted);
            let mut info = json!({ "is_dst": dst != 0 });
            if dst != 0 {
                info["dst_offset"] = json!(zones::iso_duration(dst));
            }
            result.insert("dst_info".into(), info);
        }

        result.insert(
            "components".into(),
            json!({
                "date": converted.format("%Y-%m-%d").to_string(),
                "time": converted.format("%H:%M:%S").to_string(),
                "day_of_week": format::weekday_name(converted.weekday()),
            }),
        );
        Ok(Value::Object(result))
    }

    // Rows and columns keyed by the requested names; unknown zones are left out
    fn time_matrix(source: &DateTime<Tz>, targets: &[&str]) -> Value {
        let offsets: Vec<(&str, i32)> = targets
            .iter()
            .filter_map(|name| {
                zones::resolve(name)
                    .ok()
                    .map(|zone| (*name, offset_of(&source.with_timezone(&zone))))
            })
            .collect();

        let matrix: Map<String, Value> = offsets
            .iter()
            .map(|(row, row_offset)| {
                let cells: Map<String, Value> = offsets
                    .iter()
                    .map(|(column, column_offset)| {
                        let cell = if row == column {
                            "0h".to_string()
                        } else {
                            format_difference(column_offset - row_offset)
                        };
                        ((*column).to_string(), json!(cell))
                    })
                    .collect();
                ((*row).to_string(), Value::Object(cells))
            })
            .collect();
        Value::Object(matrix)
    }
}

impl Tool for ConvertTimezone {
    fn name(&self) -> &str {
        "convert_timezone"
    }

    fn description(&self) -> &str {
        "Convert time between different timezones with support for multiple formats"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .property(
                "datetime",
                PropertySchema::string(
                    "DateTime to convert (ISO format, common formats or unix timestamp); defaults to now",
                )
                .with_example("2024-01-15T10:30:00"),
            )
            .property(
                "from_timezone",
                PropertySchema::string("Source timezone (IANA format)").with_default("UTC"),
            )
            .property(
                "to_timezone",
                PropertySchema::string("Target timezone (IANA format)"),
            )
            .property(
                "to_timezones",
                PropertySchema::array(
                    "Multiple target timezones for batch conversion",
                    PropertySchema::element(SchemaType::String),
                ),
            )
            .property(
                "format",
                PropertySchema::string("ISO8601, UNIX or a strftime pattern").with_default("ISO8601"),
            )
            .property(
                "include_dst_info",
                PropertySchema::boolean("Include DST information").with_default(false),
            )
            .property(
                "include_time_difference",
                PropertySchema::boolean("Include time difference calculation").with_default(true),
            )
            .property(
                "relative_time",
                PropertySchema::object("Shift the current time (e.g. 3 hours from now)")
                    .with_property("amount", PropertySchema::element(SchemaType::Integer))
                    .with_property(
                        "unit",
                        PropertySchema::element(SchemaType::String).with_enum(&RELATIVE_UNITS),
                    ),
            )
    }

    fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError> {
        debug!(?params, "Executing convert_timezone");

        let from = zones::resolve(optional_str(params, "from_timezone")?.unwrap_or("UTC"))?;
        let output = OutputFormat::parse(optional_str(params, "format")?.unwrap_or("ISO8601"));
        let options = Options {
            include_dst_info: bool_or(params, "include_dst_info", false)?,
            include_time_difference: bool_or(params, "include_time_difference", true)?,
        };

        let source = self.source_datetime(params, from)?;

        let single = optional_str(params, "to_timezone")?.filter(|s| !s.trim().is_empty());
        let targets: IndexSet<&str> = single
            .into_iter()
            .chain(str_list(params, "to_timezones")?)
            .collect();
        if targets.is_empty() {
            return Err(JsonRpcError::invalid_params("No target timezone specified").into());
        }
        let targets: Vec<&str> = targets.into_iter().collect();

        let mut response = ToolResponse::single(
            "source",
            json!({
                "datetime": output.render(&source),
                "timezone": from.name(),
                "unix_timestamp": source.timestamp(),
                "offset": zones::format_offset(i64::from(offset_of(&source))),
            }),
        );

        if let [target] = targets.as_slice() {
            response = response.with_data("target", Self::convert(&source, target, &output, options)?);
        } else {
            let results: Vec<Value> = targets
                .iter()
                .map(|target| {
                    Self::convert(&source, target, &output, options).unwrap_or_else(|err| {
                        warn!(timezone = %target, error = %err, "Conversion failed");
                        json!({ "timezone": target, "error": err.to_error().message })
                    })
                })
                .collect();
            response = response.with_data("targets", results);

            if options.include_time_difference {
                response = response.with_data("time_matrix", Self::time_matrix(&source, &targets));
            }
        }

        let finished = self.clock.now();
        Ok(response
            .with_metadata("conversion_count", targets.len())
            .with_metadata("execution_time", finished.timestamp_millis())
            .with_timestamp(finished))
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    fn cache_ttl_seconds(&self) -> u64 {
        CACHE_TTL_SECONDS
    }
}
