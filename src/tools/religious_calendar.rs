//! `get_religious_calendar`: a Gregorian date in another calendar system.

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;

use crate::mcp::params::{bool_or, required_str};
use crate::mcp::protocol::Params;
use crate::mcp::schema::{ParameterSchema, PropertySchema};
use crate::mcp::tool::{Tool, ToolError, ToolResponse};
use crate::services::calendar::{self, CalendarDate, CalendarKind};

pub(crate) const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

/// Parses `YYYY-MM-DD`.
pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ToolError::invalid_parameter("date", format!("Invalid format: {input}")))
}

fn converted_date(date: &CalendarDate) -> Value {
    let mut value = json!({
        "year": date.year,
        "month": date.month,
        "day": date.day,
        "month_name": date.month_name,
        "formatted": date.formatted(),
    });
    if let Some(lunar) = &date.lunar {
        value["cycle"] = json!(lunar.cycle);
        value["stem_branch"] = json!(lunar.stem_branch);
        value["zodiac"] = json!(lunar.zodiac);
        value["is_leap_month"] = json!(lunar.leap_month);
        value["related_gregorian_year"] = json!(lunar.related_gregorian_year);
    }
    value
}

/// Converts Gregorian dates to religious and traditional calendars.
#[derive(Debug, Default)]
pub struct GetReligiousCalendar;

impl Tool for GetReligiousCalendar {
    fn name(&self) -> &str {
        "get_religious_calendar"
    }

    fn description(&self) -> &str {
        "Convert Gregorian date to various religious calendars"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        let kinds: Vec<&str> = CalendarKind::ALL.iter().map(|k| k.as_str()).collect();
        ParameterSchema::new()
            .required(
                "date",
                PropertySchema::string("Date in ISO 8601 format (YYYY-MM-DD)")
                    .with_pattern(DATE_PATTERN)
                    .with_example("2024-01-15"),
            )
            .required(
                "calendar_type",
                PropertySchema::string("Type of religious calendar")
                    .with_enum(&kinds)
                    .with_example("islamic"),
            )
            .property(
                "include_holidays",
                PropertySchema::boolean("Include religious holidays and observances")
                    .with_default(true),
            )
    }

    fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError> {
        let date_input = required_str(params, "date")?;
        let kind_input = required_str(params, "calendar_type")?;
        let include_holidays = bool_or(params, "include_holidays", true)?;

        let date = parse_date(date_input)?;
        let kind: CalendarKind = kind_input.parse().map_err(|_| {
            ToolError::invalid_parameter("calendar_type", format!("Invalid type: {kind_input}"))
        })?;

        let converted = calendar::convert(date, kind)
            .ok_or_else(|| ToolError::calendar_failure(format!("Date out of range: {date}")))?;

        let mut response = ToolResponse::single("gregorian_date", date.to_string())
            .with_data("calendar_type", kind.as_str())
            .with_data("converted_date", converted_date(&converted));

        if include_holidays {
            response = response
                .with_data("holidays", json!(converted.holidays))
                .with_data("observances", json!(converted.observances));
        }

        info!(%date, calendar = %kind, "Converted calendar date");
        Ok(response.with_data(
            "metadata",
            json!({
                "calendar_name": kind.display_name(),
                "era": converted.era,
                "week_day": converted.week_day,
                "is_leap_year": converted.is_leap_year,
            }),
        ))
    }
}
