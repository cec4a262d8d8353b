//! JSON-RPC 2.0 envelope types for the tool server.
//!
//! Every transport (HTTP, WebSocket, stdio) speaks the same envelope:
//!
//! - **Request**: `{"jsonrpc":"2.0","id":...,"method":...,"params":{...}}`
//! - **Response**: exactly one of `result` or `error`, echoing the request `id`
//! - **Error**: `{"code":...,"message":...,"data":...}`
//!
//! Fields whose value is absent are omitted from the encoded form.
//!
//! # Constraints
//!
//! - Request IDs are strings or integers; a string ID must be non-empty
//! - A request whose method starts with `tools/` is a tool invocation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The only JSON-RPC version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version reported during the stdio handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol label reported by `server/info` and the WebSocket greeting.
pub const WIRE_PROTOCOL: &str = "MCP/2.0";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "fetch-time-mcp";

/// Method prefix marking a tool invocation.
pub const TOOL_METHOD_PREFIX: &str = "tools/";

/// Tool parameters: an ordered mapping of names to JSON values.
pub type Params = Map<String, Value>;

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl RequestId {
    /// Returns `true` for an empty or whitespace-only string ID.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::String(s) => s.trim().is_empty(),
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A JSON-RPC 2.0 request.
///
/// Construction performs no validation; [`JsonRpcRequest::is_valid`] is queried separately
/// so that invalid envelopes can still be answered with their `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    #[serde(default)]
    pub jsonrpc: String,

    /// Request identifier. Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The method to invoke.
    #[serde(default)]
    pub method: String,

    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

impl JsonRpcRequest {
    /// Creates a request with the version fixed to "2.0".
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Returns `true` if the version is "2.0", the ID is present and non-empty,
    /// and the method is non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION
            && self.id.as_ref().is_some_and(|id| !id.is_blank())
            && !self.method.trim().is_empty()
    }

    /// Returns `true` if this request carries no ID.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns `true` if the method names a tool (`tools/<name>`).
    #[must_use]
    pub fn is_tool_execution(&self) -> bool {
        self.method.starts_with(TOOL_METHOD_PREFIX)
    }

    /// Returns the tool name for a tool invocation, or `None` otherwise.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.method.strip_prefix(TOOL_METHOD_PREFIX)
    }
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// Protocol and domain error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Unknown or unusable timezone.
    TimezoneError,
    /// A downstream API failed.
    ApiError,
    /// A calendar conversion failed.
    CalendarError,
    /// A downstream rate limit was hit.
    RateLimitError,
    /// A downstream service rejected our credentials.
    AuthenticationError,
    /// Any other server-defined code.
    ServerError(i32),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::TimezoneError => -32001,
            Self::ApiError => -32002,
            Self::CalendarError => -32003,
            Self::RateLimitError => -32004,
            Self::AuthenticationError => -32005,
            Self::ServerError(code) => code,
        }
    }

    /// Returns the canonical message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid parameters",
            Self::InternalError => "Internal error",
            Self::TimezoneError => "Timezone error",
            Self::ApiError => "API error",
            Self::CalendarError => "Calendar error",
            Self::RateLimitError => "Rate limit exceeded",
            Self::AuthenticationError => "Authentication failed",
            Self::ServerError(_) => "Server error",
        }
    }

    /// Maps a numeric code back to its variant.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32001 => Self::TimezoneError,
            -32002 => Self::ApiError,
            -32003 => Self::CalendarError,
            -32004 => Self::RateLimitError,
            -32005 => Self::AuthenticationError,
            other => Self::ServerError(other),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct JsonRpcError {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates an error with an explicit message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Creates an error carrying the code's canonical message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        let data = data.into();
        self.data = (!data.is_null()).then_some(data);
        self
    }

    /// Returns the code as an [`ErrorCode`].
    #[must_use]
    pub const fn kind(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }

    /// Invalid JSON.
    #[must_use]
    pub fn parse_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::ParseError).with_data(details)
    }

    /// Malformed envelope.
    #[must_use]
    pub fn invalid_request(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidRequest).with_data(details)
    }

    /// Unknown method; the method name is part of the message.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    /// Parameters rejected by a tool.
    #[must_use]
    pub fn invalid_params(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidParams).with_data(details)
    }

    /// Unexpected server failure.
    #[must_use]
    pub fn internal_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::InternalError).with_data(details)
    }

    /// Timezone could not be resolved.
    #[must_use]
    pub fn timezone_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::TimezoneError).with_data(details)
    }

    /// A downstream API failed; the API name is part of the message.
    #[must_use]
    pub fn api_error(api: &str, details: impl Into<Value>) -> Self {
        Self::new(ErrorCode::ApiError, format!("API error: {api}")).with_data(details)
    }

    /// A calendar conversion failed.
    #[must_use]
    pub fn calendar_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::CalendarError).with_data(details)
    }

    /// A downstream rate limit was hit.
    #[must_use]
    pub fn rate_limit_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::RateLimitError).with_data(details)
    }

    /// A downstream service rejected our credentials.
    #[must_use]
    pub fn authentication_error(details: impl Into<Value>) -> Self {
        Self::from_code(ErrorCode::AuthenticationError).with_data(details)
    }
}

/// A JSON-RPC 2.0 response.
///
/// The constructors are the only way to build one, so `result` and `error`
/// are never both populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a success response. A `null` result is stored as absent.
    #[must_use]
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: (!result.is_null()).then_some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Creates an error response from a code and message.
    #[must_use]
    pub fn error_with(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::error(id, JsonRpcError::new(code, message))
    }

    /// The protocol version, always "2.0" for constructed responses.
    #[must_use]
    pub fn jsonrpc(&self) -> &str {
        &self.jsonrpc
    }

    /// The ID this response answers.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// The success payload, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The error payload, if any.
    #[must_use]
    pub const fn error_object(&self) -> Option<&JsonRpcError> {
        self.error.as_ref()
    }

    /// `true` when a result is present and no error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// `true` when an error is present.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Decodes one wire message into a request.
///
/// # Errors
///
/// Returns a ready-to-send error response: `PARSE_ERROR` when the text is not a JSON
/// object, `INVALID_REQUEST` when the object has the wrong field types.
pub fn decode_request(json: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()))
    })?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcResponse::error(
            None,
            JsonRpcError::parse_error("Request must be a JSON object"),
        ));
    };

    // Salvage the ID so type errors elsewhere can still be correlated
    let id = obj
        .get("id")
        .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

    serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::error(id, JsonRpcError::invalid_request(e.to_string())))
}
