//! fetch-time-mcp: an MCP tool server for time, calendars and astronomy
//!
//! Tools are exposed over JSON-RPC 2.0 on three transports: HTTP POST,
//! WebSocket and newline-delimited stdio.
//!
//! # Tools
//!
//! - **`get_current_time`**: current instant in any IANA zone, with DST and zone details
//! - **`convert_timezone`**: convert a datetime into one or more zones
//! - **`get_religious_calendar`**: Islamic, Hebrew, Buddhist, Hindu (Saka), Chinese and Japanese dates
//! - **`get_astronomical_info`**: sunrise, sunset, twilight and moon phase for a location
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: Protocol envelope, tool contract, registry, dispatcher and transports
//! - [`services`]: Clock, timezone, calendar and astronomy computations
//! - [`tools`]: The built-in tools

pub mod config;
pub mod error;
pub mod mcp;
pub mod services;
pub mod tools;
