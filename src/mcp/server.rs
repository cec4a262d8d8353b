//! MCP server over stdio.
//!
//! The lifecycle follows the MCP stdio binding:
//!
//! 1. **Startup**: an `initialized` notification is sent unsolicited
//! 2. **Operation**: `initialize`, `tools/list`, `tools/call`, `ping`
//! 3. **Shutdown**: EOF on stdin, SIGINT or SIGTERM
//!
//! Tool calls use the `tools/call` framing (`{"name", "arguments"}`) and are
//! translated into the shared [`Dispatcher`] pipeline. Results are wrapped
//! as text content.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info};

use crate::error::ServerError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{
    decode_request, ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingNotification,
    Params, RequestId, JSONRPC_VERSION, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};

/// Server information sent during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// A single text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

fn handshake() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": ServerInfo::default(),
    })
}

/// The stdio MCP server.
pub struct StdioServer {
    dispatcher: Arc<Dispatcher>,
}

impl StdioServer {
    /// Creates a server answering through `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Runs on the process's stdin/stdout until EOF or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut transport = StdioTransport::stdio();
        self.run_with_shutdown(&mut transport).await
    }

    /// Serves one transport until EOF. Used directly by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&self, transport: &mut LineTransport<R, W>) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.announce(transport).await?;
        while let Some(line) = transport.read_line().await? {
            self.handle_line(transport, line).await?;
        }
        info!("stdin closed, stopping stdio server");
        Ok(())
    }

    #[cfg(unix)]
    async fn run_with_shutdown<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        self.announce(transport).await?;
        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line = transport.read_line() => {
                    let Some(line) = line? else {
                        info!("stdin closed, stopping stdio server");
                        return Ok(());
                    };
                    self.handle_line(transport, line).await?;
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        self.announce(transport).await?;
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line = transport.read_line() => {
                    let Some(line) = line? else {
                        info!("stdin closed, stopping stdio server");
                        return Ok(());
                    };
                    self.handle_line(transport, line).await?;
                }
            }
        }
    }

    async fn announce<R, W>(&self, transport: &mut LineTransport<R, W>) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.dispatcher.registry().len(), "Starting stdio server");
        let notification = OutgoingNotification::new("initialized", Some(handshake()));
        transport.write_json(&notification).await?;
        Ok(())
    }

    async fn handle_line<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
        line: String,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if line.trim().is_empty() {
            return Ok(());
        }

        // Tools run synchronously; keep them off the reactor
        let dispatcher = Arc::clone(&self.dispatcher);
        let reply = tokio::task::spawn_blocking(move || respond(&dispatcher, &line))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "stdio request task failed");
                Some(JsonRpcResponse::error_with(
                    None,
                    ErrorCode::InternalError,
                    "Internal error",
                ))
            });

        if let Some(response) = reply {
            transport.write_json(&response).await?;
        }
        Ok(())
    }

    /// Answers one line. `None` means nothing is written back (notifications).
    #[must_use]
    pub fn respond(&self, line: &str) -> Option<JsonRpcResponse> {
        respond(&self.dispatcher, line)
    }
}

fn respond(dispatcher: &Dispatcher, line: &str) -> Option<JsonRpcResponse> {
    let request = match decode_request(line) {
        Ok(request) => request,
        Err(response) => {
            debug!("Rejected undecodable stdio message");
            return Some(response);
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(JsonRpcResponse::error(
            request.id,
            JsonRpcError::invalid_request("jsonrpc must be 2.0"),
        ));
    }

    if request.is_notification() {
        debug!(method = %request.method, "Received notification");
        return None;
    }

    debug!(method = %request.method, id = ?request.id, "Received stdio request");
    let id = request.id.clone();
    Some(match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, handshake()),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": definitions(dispatcher) })),
        "tools/call" => tool_call(dispatcher, &request),
        "ping" => JsonRpcResponse::success(id, json!({})),
        method => JsonRpcResponse::error(id, JsonRpcError::method_not_found(method)),
    })
}

fn definitions(dispatcher: &Dispatcher) -> Vec<ToolDefinition> {
    dispatcher
        .registry()
        .list_descriptors()
        .into_iter()
        .map(|d| ToolDefinition {
            name: d.name,
            description: d.description,
            input_schema: d.parameters,
        })
        .collect()
}

fn tool_call(dispatcher: &Dispatcher, request: &JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();
    let invalid = |message: String| {
        JsonRpcResponse::error(id.clone(), JsonRpcError::new(ErrorCode::InvalidParams, message))
    };

    let params = request.params.as_ref();
    let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
        return invalid("Missing tool name".to_string());
    };
    if !dispatcher.registry().has_tool(name) {
        return invalid(format!("Tool not found: {name}"));
    }

    // Absent arguments mean "no parameters"
    let arguments: Params = match params.and_then(|p| p.get("arguments")) {
        None | Some(Value::Null) => Params::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(_) => return invalid("arguments must be an object".to_string()),
    };

    let response = dispatcher.call_tool(id.as_ref(), name, Some(&arguments));
    let wrapped = response.result().map(|data| wrap_text(id, data));
    wrapped.unwrap_or(response)
}

fn wrap_text(id: Option<RequestId>, data: &Value) -> JsonRpcResponse {
    let result = serde_json::to_value(ToolCallResult::text(data.to_string()));
    match result {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => {
            error!(error = %e, "Failed to serialise tool call result");
            JsonRpcResponse::error_with(
                id,
                ErrorCode::InternalError,
                "Internal error: failed to serialise result",
            )
        }
    }
}
