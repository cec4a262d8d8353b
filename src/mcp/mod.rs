//! Model Context Protocol (MCP) server implementation.
//!
//! Every transport decodes wire messages into the same envelope and hands
//! them to one shared [`Dispatcher`], which resolves tools from the
//! [`ToolRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │ Transports  │───▶│ Dispatcher  │───▶│  Registry   │     │
//! │   │ http/ws/std │    │  (routing)  │    │   (tools)   │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐       │
//! │   │              JSON-RPC Messages                  │       │
//! │   └─────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! The stdio handshake advertises MCP protocol version 2024-11-05.

pub mod dispatcher;
pub mod http;
pub mod params;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod tool;
pub mod transport;

pub use dispatcher::{Dispatcher, ServerCapabilities};
pub use protocol::{
    ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION,
};
pub use registry::ToolRegistry;
pub use server::StdioServer;
pub use tool::{Tool, ToolError, ToolResponse};
pub use transport::{LineTransport, StdioTransport};
