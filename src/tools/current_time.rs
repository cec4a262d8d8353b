//! `get_current_time`: the current instant rendered in a timezone.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::debug;

use crate::mcp::params::{bool_or, optional_str};
use crate::mcp::protocol::{JsonRpcError, Params};
use crate::mcp::schema::{ParameterSchema, PropertySchema};
use crate::mcp::tool::{Tool, ToolError, ToolResponse};
use crate::services::clock::Clock;
use crate::services::zones;
use crate::tools::format;

/// Output formats for the `timestamp` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Iso8601,
    Rfc3339,
    Unix,
    Human,
    Custom,
}

impl OutputFormat {
    const NAMES: [&'static str; 5] = ["ISO8601", "RFC3339", "UNIX", "HUMAN", "CUSTOM"];
}

impl FromStr for OutputFormat {
    type Err = JsonRpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ISO8601" => Ok(Self::Iso8601),
            "RFC3339" => Ok(Self::Rfc3339),
            "UNIX" => Ok(Self::Unix),
            "HUMAN" => Ok(Self::Human),
            "CUSTOM" => Ok(Self::Custom),
            _ => Err(JsonRpcError::invalid_params(format!("Invalid format: {s}"))),
        }
    }
}

/// Reports the current time in a requested zone.
pub struct GetCurrentTime {
    clock: Arc<dyn Clock>,
}

impl GetCurrentTime {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn render(
        now: &DateTime<Tz>,
        format: OutputFormat,
        custom: Option<&str>,
    ) -> Result<String, ToolError> {
        Ok(match format {
            OutputFormat::Iso8601 => format::iso8601(now),
            OutputFormat::Rfc3339 => format::rfc3339(now),
            OutputFormat::Unix => now.timestamp().to_string(),
            OutputFormat::Human => format::human(now),
            OutputFormat::Custom => {
                let pattern = custom
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        ToolError::invalid_parameter(
                            "custom_format",
                            "required when format=CUSTOM",
                        )
                    })?;
                format::strftime(now, pattern).ok_or_else(|| {
                    ToolError::invalid_parameter(
                        "custom_format",
                        format!("Invalid custom format pattern: {pattern}"),
                    )
                })?
            }
        })
    }

    fn dst_info(&self, now: &DateTime<Tz>) -> Value {
        let dst = zones::dst_seconds(now);
        let mut info = json!({
            "is_dst": dst != 0,
            "dst_offset_seconds": dst,
            "dst_offset": zones::iso_duration(dst),
        });
        if let Some(transition) = zones::next_transition(now.timezone(), self.clock.now()) {
            info["next_transition"] = json!(format::utc_instant(transition.at));
            info["next_transition_type"] = json!(transition.kind().as_str());
        }
        info
    }

    fn zone_info(&self, now: &DateTime<Tz>) -> Value {
        json!({
            "zone_id": now.timezone().name(),
            "abbreviation": now.format("%Z").to_string(),
            "standard_offset": zones::format_offset(zones::standard_offset_seconds(now)),
            "has_fixed_offset": zones::has_fixed_offset(now.timezone(), self.clock.now()),
        })
    }
}

impl Tool for GetCurrentTime {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get current time in specified timezone with various format options"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .property(
                "timezone",
                PropertySchema::string("IANA timezone name (e.g., Asia/Tokyo, America/New_York)")
                    .with_default("UTC"),
            )
            .property(
                "format",
                PropertySchema::string("Output format for the timestamp")
                    .with_enum(&OutputFormat::NAMES)
                    .with_default("ISO8601"),
            )
            .property(
                "custom_format",
                PropertySchema::string("strftime pattern, required when format=CUSTOM")
                    .with_example("%Y-%m-%d %H:%M"),
            )
            .property(
                "include_dst",
                PropertySchema::boolean("Include DST information").with_default(false),
            )
            .property(
                "include_offset",
                PropertySchema::boolean("Include UTC offset information").with_default(true),
            )
            .property(
                "include_zone_info",
                PropertySchema::boolean("Include detailed timezone information")
                    .with_default(false),
            )
    }

    // Every parameter is optional, so a missing object is fine
    fn validate_parameters(&self, params: Option<&Params>) -> Result<(), JsonRpcError> {
        let Some(params) = params else {
            return Ok(());
        };
        if params.get("timezone").is_some_and(|v| !v.is_null() && !v.is_string()) {
            return Err(JsonRpcError::invalid_params("timezone must be a string"));
        }
        match params.get("format") {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(format)) => format.parse::<OutputFormat>().map(|_| ()),
            Some(_) => Err(JsonRpcError::invalid_params("format must be a string")),
        }
    }

    fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError> {
        debug!(?params, "Executing get_current_time");

        let zone_name = optional_str(params, "timezone")?.unwrap_or("UTC");
        let output = optional_str(params, "format")?
            .unwrap_or("ISO8601")
            .parse::<OutputFormat>()?;
        let custom = optional_str(params, "custom_format")?;
        let include_dst = bool_or(params, "include_dst", false)?;
        let include_offset = bool_or(params, "include_offset", true)?;
        let include_zone_info = bool_or(params, "include_zone_info", false)?;

        let zone = zones::resolve(zone_name)?;
        let instant = self.clock.now();
        let now = instant.with_timezone(&zone);

        let mut response = ToolResponse::single("timestamp", Self::render(&now, output, custom)?)
            .with_data("timezone", zone.name())
            .with_data("unix_timestamp", now.timestamp())
            .with_data("unix_timestamp_millis", now.timestamp_millis());

        if include_offset {
            let offset = zones::offset_seconds(zone, instant);
            response = response
                .with_data("utc_offset", zones::format_offset(i64::from(offset)))
                .with_data("utc_offset_seconds", offset);
        }
        if include_dst {
            response = response.with_data("dst_info", self.dst_info(&now));
        }
        if include_zone_info {
            response = response.with_data("zone_info", self.zone_info(&now));
        }

        Ok(response
            .with_data(
                "date_components",
                json!({
                    "year": now.year(),
                    "month": now.month(),
                    "day": now.day(),
                    "hour": now.hour(),
                    "minute": now.minute(),
                    "second": now.second(),
                    "nano": now.nanosecond(),
                    "day_of_week": format::weekday_name(now.weekday()),
                    "day_of_year": now.ordinal(),
                }),
            )
            .with_metadata("execution_time", instant.timestamp_millis())
            .with_metadata("timezone_valid", true)
            .with_timestamp(instant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn tool() -> GetCurrentTime {
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap();
        GetCurrentTime::new(Arc::new(FixedClock::new(instant)))
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn tokyo_defaults() {
        let response = tool()
            .execute(&params(json!({ "timezone": "Asia/Tokyo" })))
            .unwrap();
        let data = response.data();
        assert_eq!(data["timestamp"], "2024-01-15T10:30:00+09:00");
        assert_eq!(data["timezone"], "Asia/Tokyo");
        assert_eq!(data["unix_timestamp"], 1_705_282_200);
        assert_eq!(data["utc_offset"], "+09:00");
        assert_eq!(data["utc_offset_seconds"], 32_400);
        assert_eq!(data["date_components"]["day_of_week"], "MONDAY");
        assert_eq!(data["date_components"]["hour"], 10);
        assert!(data.get("dst_info").is_none());
        assert_eq!(
            response.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap()
        );
        assert_eq!(response.metadata()["timezone_valid"], true);
    }

    #[test]
    fn utc_is_the_default_zone() {
        let response = tool().execute(&Params::new()).unwrap();
        assert_eq!(response.data()["timezone"], "UTC");
        assert_eq!(response.data()["timestamp"], "2024-01-15T01:30:00Z");
        assert_eq!(response.data()["utc_offset"], "Z");
    }

    #[test]
    fn abbreviation_unix_and_human() {
        let unix = tool()
            .execute(&params(json!({ "timezone": "JST", "format": "unix" })))
            .unwrap();
        assert_eq!(unix.data()["timestamp"], "1705282200");
        assert_eq!(unix.data()["timezone"], "Asia/Tokyo");

        let human = tool()
            .execute(&params(json!({ "timezone": "JST", "format": "HUMAN" })))
            .unwrap();
        assert_eq!(human.data()["timestamp"], "2024-01-15 10:30:00 JST");
    }

    #[test]
    fn custom_format_needs_a_pattern() {
        let err = tool()
            .execute(&params(json!({ "format": "CUSTOM" })))
            .unwrap_err()
            .to_error();
        assert_eq!(err.code, -32602);

        let ok = tool()
            .execute(&params(json!({ "format": "CUSTOM", "custom_format": "%Y/%m/%d" })))
            .unwrap();
        assert_eq!(ok.data()["timestamp"], "2024/01/15");
    }

    #[test]
    fn dst_and_zone_info() {
        let response = tool()
            .execute(&params(json!({
                "timezone": "America/New_York",
                "include_dst": true,
                "include_zone_info": true,
            })))
            .unwrap();
        let dst = &response.data()["dst_info"];
        assert_eq!(dst["is_dst"], false);
        assert_eq!(dst["dst_offset"], "PT0S");
        assert_eq!(dst["next_transition"], "2024-03-10T07:00:00Z");
        assert_eq!(dst["next_transition_type"], "SPRING_FORWARD");

        let zone = &response.data()["zone_info"];
        assert_eq!(zone["abbreviation"], "EST");
        assert_eq!(zone["standard_offset"], "-05:00");
        assert_eq!(zone["has_fixed_offset"], false);
    }

    #[test]
    fn invalid_zone_suggests_alternatives() {
        let err = tool()
            .execute(&params(json!({ "timezone": "Tokyo" })))
            .unwrap_err()
            .to_error();
        assert_eq!(err.code, -32001);
        assert!(err.data.unwrap()["suggestions"]
            .as_str()
            .unwrap()
            .contains("Asia/Tokyo"));
    }

    #[test]
    fn validation() {
        let tool = tool();
        assert!(tool.validate_parameters(None).is_ok());
        assert!(tool
            .validate_parameters(Some(&params(json!({ "format": "iso8601" }))))
            .is_ok());
        let err = tool
            .validate_parameters(Some(&params(json!({ "format": "XML" }))))
            .unwrap_err();
        assert_eq!(err.code, -32602);
        assert_eq!(err.data, Some(json!("Invalid format: XML")));
        assert!(tool
            .validate_parameters(Some(&params(json!({ "timezone": 9 }))))
            .is_err());
    }
}
