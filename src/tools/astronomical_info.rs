//! `get_astronomical_info`: sun and moon events for a place and date.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde_json::{json, Value};
use tracing::info;

use crate::mcp::params::{bool_or, required_number, required_str};
use crate::mcp::protocol::Params;
use crate::mcp::schema::{ParameterSchema, PropertySchema};
use crate::mcp::tool::{Tool, ToolError, ToolResponse};
use crate::services::astronomy::{self, MoonPhase, SunHorizon};
use crate::tools::format;
use crate::tools::religious_calendar::{parse_date, DATE_PATTERN};

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn instant(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |t| json!(format::utc_instant(t)))
}

fn hms(span: TimeDelta) -> String {
    let total = span.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn checked_coordinate(params: &Params, key: &str, limit: f64) -> Result<f64, ToolError> {
    let value = required_number(params, key)?;
    if (-limit..=limit).contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::invalid_parameter(
            key,
            format!("must be between -{limit} and {limit}"),
        ))
    }
}

/// Sun and moon details for one location.
#[derive(Debug, Default)]
pub struct GetAstronomicalInfo;

impl GetAstronomicalInfo {
    fn sun(date: NaiveDate, latitude: f64, longitude: f64, twilight: bool) -> Value {
        let daylight = astronomy::sun_rise_set(date, latitude, longitude, SunHorizon::Sunrise);
        let noon = astronomy::solar_noon(date, latitude, longitude);

        let day_length = match (daylight.rise, daylight.set) {
            (Some(rise), Some(set)) => hms(set - rise),
            // No crossing: the sun stays up all day or stays down all day
            _ => {
                let up = noon.is_some_and(|noon| {
                    astronomy::sun_position(noon, latitude, longitude).altitude > -0.833
                });
                let length = if up { "24:00:00" } else { "00:00:00" };
                length.to_string()
            }
        };

        let mut sun = json!({
            "sunrise": instant(daylight.rise),
            "sunset": instant(daylight.set),
            "solar_noon": instant(noon),
            "day_length": day_length,
        });

        if twilight {
            let civil = astronomy::sun_rise_set(date, latitude, longitude, SunHorizon::Civil);
            let nautical = astronomy::sun_rise_set(date, latitude, longitude, SunHorizon::Nautical);
            let astro = astronomy::sun_rise_set(date, latitude, longitude, SunHorizon::Astronomical);
            sun["twilight"] = json!({
                "civil_dawn": instant(civil.rise),
                "civil_dusk": instant(civil.set),
                "nautical_dawn": instant(nautical.rise),
                "nautical_dusk": instant(nautical.set),
                "astronomical_dawn": instant(astro.rise),
                "astronomical_dusk": instant(astro.set),
            });
        }
        sun
    }

    fn moon(date: NaiveDate, midday: DateTime<Utc>, latitude: f64, longitude: f64) -> Value {
        let times = astronomy::moon_rise_set(date, latitude, longitude);
        let illumination = astronomy::moon_illumination(midday);
        let position = astronomy::moon_position(midday, latitude, longitude);

        json!({
            "moonrise": instant(times.rise),
            "moonset": instant(times.set),
            "phase": MoonPhase::from_illumination(&illumination).name(),
            "illumination": round1(illumination.fraction * 100.0),
            "age": astronomy::moon_age(date),
            "distance": round1(position.distance_km),
        })
    }
}

impl Tool for GetAstronomicalInfo {
    fn name(&self) -> &str {
        "get_astronomical_info"
    }

    fn description(&self) -> &str {
        "Get astronomical information for a specific location and date"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "latitude",
                PropertySchema::number("Latitude of the location (-90 to 90)")
                    .with_range(-90.0, 90.0)
                    .with_example(35.6762),
            )
            .required(
                "longitude",
                PropertySchema::number("Longitude of the location (-180 to 180)")
                    .with_range(-180.0, 180.0)
                    .with_example(139.6503),
            )
            .required(
                "date",
                PropertySchema::string("Date in ISO 8601 format (YYYY-MM-DD)")
                    .with_pattern(DATE_PATTERN)
                    .with_example("2024-01-15"),
            )
            .property(
                "include_moon_phase",
                PropertySchema::boolean("Include moon phase information").with_default(true),
            )
            .property(
                "include_twilight",
                PropertySchema::boolean("Include twilight times (civil, nautical, astronomical)")
                    .with_default(false),
            )
    }

    fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError> {
        let latitude = checked_coordinate(params, "latitude", 90.0)?;
        let longitude = checked_coordinate(params, "longitude", 180.0)?;
        let date = parse_date(required_str(params, "date")?)?;
        let include_moon = bool_or(params, "include_moon_phase", true)?;
        let include_twilight = bool_or(params, "include_twilight", false)?;

        let midday = date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::hours(12);

        let mut response = ToolResponse::single(
            "location",
            json!({ "latitude": latitude, "longitude": longitude }),
        )
        .with_data("date", date.to_string())
        .with_data("sun", Self::sun(date, latitude, longitude, include_twilight));

        if include_moon {
            response = response.with_data("moon", Self::moon(date, midday, latitude, longitude));
        }

        let solar = astronomy::sun_position(midday, latitude, longitude);
        info!(latitude, longitude, %date, "Computed astronomical info");
        Ok(response.with_data(
            "solar_position",
            json!({
                "azimuth": round1(solar.azimuth),
                "altitude": round1(solar.altitude),
            }),
        ))
    }
}
