//! Transport-agnostic request processing.
//!
//! [`Dispatcher::process`] turns one request into exactly one response:
//!
//! 1. Reject envelopes that fail validation (`INVALID_REQUEST`)
//! 2. Answer built-in methods (`tools/list`, `ping`, `server/info`)
//! 3. Route `tools/<name>` to the registry, validate, execute
//! 4. Map tool failures and panics to error responses
//!
//! Built-ins are matched before the `tools/` prefix so that `tools/list`
//! never resolves to a tool named `list`.
//!
//! The dispatcher holds no per-request state and is shared by every transport.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::mcp::protocol::{
    ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Params, RequestId, SERVER_NAME,
    WIRE_PROTOCOL,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::ToolError;
use crate::services::clock::{Clock, SystemClock};

/// Capability flags reported by `server/info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerCapabilities {
    /// Always `true`.
    pub tools: bool,
    /// Whether the WebSocket endpoint is enabled.
    pub websocket: bool,
    /// Whether response caching is advertised.
    pub caching: bool,
}

impl ServerCapabilities {
    /// Capabilities with the given transport flags.
    #[must_use]
    pub const fn new(websocket: bool, caching: bool) -> Self {
        Self {
            tools: true,
            websocket,
            caching,
        }
    }
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Routes requests to built-in handlers and registered tools.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    capabilities: ServerCapabilities,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, capabilities: ServerCapabilities) -> Self {
        Self {
            registry,
            capabilities,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for `ping` timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The registry this dispatcher resolves tools from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The clock behind `ping` and connection timestamps.
    #[must_use]
    pub const fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The advertised capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    /// Processes one request. Never panics; every failure becomes an error response.
    #[must_use]
    pub fn process(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        guarded(request.id.as_ref(), || self.route(request))
    }

    /// Runs the tool pipeline (lookup, validate, execute) directly.
    ///
    /// Used by transports whose framing names the tool outside the method.
    #[must_use]
    pub fn call_tool(
        &self,
        id: Option<&RequestId>,
        name: &str,
        params: Option<&Params>,
    ) -> JsonRpcResponse {
        guarded(id, || self.execute_tool(id.cloned(), name, params))
    }

    fn route(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        if let Some(reason) = invalid_reason(request) {
            debug!(method = %request.method, reason, "Rejected invalid request");
            return JsonRpcResponse::error(id, JsonRpcError::invalid_request(reason));
        }

        match request.method.as_str() {
            "tools/list" => {
                let tools = self.registry.list_descriptors();
                JsonRpcResponse::success(id, json!({ "tools": tools }))
            }
            "ping" => JsonRpcResponse::success(
                id,
                json!({ "pong": true, "timestamp": self.clock.now().timestamp_millis() }),
            ),
            "server/info" => JsonRpcResponse::success(
                id,
                json!({
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                    "protocol": WIRE_PROTOCOL,
                    "capabilities": self.capabilities,
                }),
            ),
            method => match request.tool_name() {
                Some(name) => self.execute_tool(id, name, request.params.as_ref()),
                None => {
                    debug!(method, "Unknown method");
                    JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
                }
            },
        }
    }

    fn execute_tool(
        &self,
        id: Option<RequestId>,
        name: &str,
        params: Option<&Params>,
    ) -> JsonRpcResponse {
        let Some(tool) = self.registry.get(name) else {
            debug!(tool = %name, "Tool not found");
            return JsonRpcResponse::error_with(
                id,
                ErrorCode::MethodNotFound,
                format!("Tool not found: {name}"),
            );
        };

        if let Err(error) = tool.validate_parameters(params) {
            debug!(tool = %name, code = error.code, "Parameter validation failed");
            return JsonRpcResponse::error(id, error);
        }

        let empty = Params::new();
        match tool.execute(params.unwrap_or(&empty)) {
            Ok(response) => {
                debug!(tool = %name, metadata = ?response.metadata(), "Tool executed");
                JsonRpcResponse::success(id, response.into_data())
            }
            Err(ToolError::Execution(error)) => {
                warn!(tool = %name, code = error.code, detail = %error.message, "Tool execution failed");
                JsonRpcResponse::error(id, error)
            }
            Err(ToolError::Unexpected(detail)) => {
                error!(tool = %name, %detail, "Unexpected tool failure");
                JsonRpcResponse::error_with(id, ErrorCode::InternalError, detail)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

fn invalid_reason(request: &JsonRpcRequest) -> Option<&'static str> {
    if request.is_valid() {
        return None;
    }
    if request.jsonrpc != crate::mcp::protocol::JSONRPC_VERSION {
        Some("jsonrpc field must be \"2.0\"")
    } else if !request.id.as_ref().is_some_and(|id| !id.is_blank()) {
        Some("id field is required")
    } else {
        Some("method field cannot be empty")
    }
}

fn guarded(id: Option<&RequestId>, f: impl FnOnce() -> JsonRpcResponse) -> JsonRpcResponse {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = panic_message(payload.as_ref());
        error!(%detail, "Request processing panicked");
        JsonRpcResponse::error_with(id.cloned(), ErrorCode::InternalError, detail)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "request processing panicked".to_string())
}
