//! The capability contract every tool implements.
//!
//! A tool describes itself (name, description, parameter schema), validates
//! parameters before it runs, and executes synchronously. Execution failures
//! carry a structured [`JsonRpcError`] so the dispatcher can put them on the
//! wire unchanged.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, JsonRpcError, Params};
use crate::mcp::schema::ParameterSchema;

/// A named, self-describing unit of computation.
///
/// Implementations must be safe to call from many workers at once; they
/// hold no per-call mutable state.
pub trait Tool: Send + Sync {
    /// Stable unique identifier used as the dispatch key.
    fn name(&self) -> &str;

    /// Human-readable summary.
    fn description(&self) -> &str;

    /// Declarative parameter shape, published through `tools/list`.
    fn parameter_schema(&self) -> ParameterSchema;

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] for domain failures (bad timezone,
    /// unparseable date, out-of-range coordinate) and
    /// [`ToolError::Unexpected`] for anything unclassified.
    fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError>;

    /// Checks parameters before [`Tool::execute`] is called.
    ///
    /// The default rejects only a missing parameter object.
    ///
    /// # Errors
    ///
    /// Returns the error to send back instead of executing.
    fn validate_parameters(&self, params: Option<&Params>) -> Result<(), JsonRpcError> {
        match params {
            Some(_) => Ok(()),
            None => Err(JsonRpcError::invalid_params("Parameters cannot be null")),
        }
    }

    /// Whether results may be cached by an external collaborator.
    fn is_cacheable(&self) -> bool {
        false
    }

    /// Suggested cache lifetime in seconds.
    fn cache_ttl_seconds(&self) -> u64 {
        0
    }
}

/// The output of one tool execution.
///
/// Only `data` reaches the HTTP/WebSocket wire; `metadata` is diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    data: Params,
    metadata: Params,
    timestamp: DateTime<Utc>,
}

impl ToolResponse {
    /// Creates a response with the given data and no metadata.
    #[must_use]
    pub fn new(data: Params) -> Self {
        Self {
            data,
            metadata: Params::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a response from a JSON value.
    ///
    /// Objects become the data map directly; any other value is stored under `"value"`.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            other => Self::single("value", other),
        }
    }

    /// Creates a response holding one data entry.
    #[must_use]
    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Params::new()).with_data(key, value)
    }

    /// Adds one data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Stamps the response with `timestamp` instead of the wall clock.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The result payload.
    #[must_use]
    pub const fn data(&self) -> &Params {
        &self.data
    }

    /// Diagnostic metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Params {
        &self.metadata
    }

    /// When the response was produced.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Consumes the response, returning the data as a JSON object.
    #[must_use]
    pub fn into_data(self) -> Value {
        Value::Object(self.data)
    }
}

/// A tool execution failure.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// A classified domain failure carrying the error to report.
    #[error("{}", .0.message)]
    Execution(#[from] JsonRpcError),

    /// Anything the tool could not classify.
    #[error("{0}")]
    Unexpected(String),
}

impl ToolError {
    /// Unknown timezone, with similar zone names offered as `data.suggestions`.
    #[must_use]
    pub fn invalid_timezone(timezone: &str, suggestions: impl Into<String>) -> Self {
        Self::Execution(
            JsonRpcError::new(ErrorCode::TimezoneError, format!("Invalid timezone: {timezone}"))
                .with_data(serde_json::json!({ "suggestions": suggestions.into() })),
        )
    }

    /// A parameter failed a domain check.
    #[must_use]
    pub fn invalid_parameter(parameter: &str, reason: impl std::fmt::Display) -> Self {
        Self::Execution(invalid_parameter(parameter, reason))
    }

    /// A calendar conversion could not be carried out.
    #[must_use]
    pub fn calendar_failure(reason: impl Into<String>) -> Self {
        Self::Execution(JsonRpcError::calendar_error(reason.into()))
    }

    /// A downstream API call failed.
    #[must_use]
    pub fn api_failure(api: &str, reason: impl Into<String>) -> Self {
        Self::Execution(
            JsonRpcError::new(ErrorCode::ApiError, format!("API call failed: {api}"))
                .with_data(serde_json::json!({ "reason": reason.into() })),
        )
    }

    /// A downstream API refused the call for rate reasons.
    #[must_use]
    pub fn rate_limit_exceeded(api: &str) -> Self {
        Self::Execution(JsonRpcError::new(
            ErrorCode::RateLimitError,
            format!("Rate limit exceeded for API: {api}"),
        ))
    }

    /// An unclassified failure.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// The error to put on the wire.
    #[must_use]
    pub fn to_error(&self) -> JsonRpcError {
        match self {
            Self::Execution(error) => error.clone(),
            Self::Unexpected(message) => JsonRpcError::new(ErrorCode::InternalError, message.clone()),
        }
    }
}

/// `INVALID_PARAMS` error naming the offending parameter.
#[must_use]
pub fn invalid_parameter(parameter: &str, reason: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(
        ErrorCode::InvalidParams,
        format!("Invalid parameter '{parameter}': {reason}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its parameters"
        }

        fn parameter_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
        }

        fn execute(&self, params: &Params) -> Result<ToolResponse, ToolError> {
            Ok(ToolResponse::new(params.clone()))
        }
    }

    #[test]
    fn default_validation_rejects_missing_params() {
        let err = Echo.validate_parameters(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams.code());
        assert!(Echo.validate_parameters(Some(&Params::new())).is_ok());
    }

    #[test]
    fn default_cache_hints() {
        assert!(!Echo.is_cacheable());
        assert_eq!(Echo.cache_ttl_seconds(), 0);
    }

    #[test]
    fn response_keeps_data_and_metadata_apart() {
        let response = ToolResponse::single("answer", 42).with_metadata("cache_hit", false);
        assert_eq!(response.data().get("answer"), Some(&json!(42)));
        assert!(response.data().get("cache_hit").is_none());
        assert_eq!(response.metadata().get("cache_hit"), Some(&json!(false)));
        assert_eq!(response.into_data(), json!({"answer": 42}));
    }

    #[test]
    fn response_from_non_object_value() {
        let response = ToolResponse::from_value(json!([1, 2]));
        assert_eq!(response.data().get("value"), Some(&json!([1, 2])));
    }

    #[test]
    fn invalid_timezone_carries_suggestions() {
        let err = ToolError::invalid_timezone("Tokio", "Asia/Tokyo").to_error();
        assert_eq!(err.code, ErrorCode::TimezoneError.code());
        assert_eq!(err.message, "Invalid timezone: Tokio");
        assert_eq!(err.data, Some(json!({"suggestions": "Asia/Tokyo"})));
    }

    #[test]
    fn unexpected_maps_to_internal_error() {
        let err = ToolError::unexpected("boom").to_error();
        assert_eq!(err.code, ErrorCode::InternalError.code());
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn explicit_timestamp_replaces_wall_clock() {
        let instant = Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).unwrap();
        let response = ToolResponse::single("answer", 42).with_timestamp(instant);
        assert_eq!(response.timestamp(), instant);
    }

    #[test]
    fn api_failures_name_the_api() {
        let err = ToolError::api_failure("worldtime", "connection refused").to_error();
        assert_eq!(err.code, ErrorCode::ApiError.code());
        assert_eq!(err.message, "API call failed: worldtime");
        assert_eq!(err.data.unwrap()["reason"], "connection refused");

        let err = ToolError::rate_limit_exceeded("worldtime").to_error();
        assert_eq!(err.kind(), ErrorCode::RateLimitError);
    }

    #[test]
    fn invalid_parameter_message() {
        let err = invalid_parameter("latitude", "must be between -90 and 90");
        assert_eq!(
            err.message,
            "Invalid parameter 'latitude': must be between -90 and 90"
        );
    }
}
