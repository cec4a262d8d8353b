//! Integration tests for MCP protocol handling.
//!
//! These tests drive the dispatcher with decoded wire messages and the real
//! tool set, covering the request/response contract end to end.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use fetch_time_mcp::mcp::protocol::{decode_request, ErrorCode, JsonRpcResponse, RequestId};
use fetch_time_mcp::mcp::{Dispatcher, ServerCapabilities, ToolRegistry};
use fetch_time_mcp::services::{Clock, FixedClock};
use fetch_time_mcp::tools::register_default_tools;

fn dispatcher() -> Dispatcher {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap(),
    ));
    let registry = Arc::new(ToolRegistry::new());
    register_default_tools(&registry, &clock).unwrap();
    Dispatcher::new(registry, ServerCapabilities::new(true, false)).with_clock(clock)
}

fn send(dispatcher: &Dispatcher, json: &str) -> JsonRpcResponse {
    match decode_request(json) {
        Ok(request) => dispatcher.process(&request),
        Err(response) => response,
    }
}

fn wire(response: &JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap()
}

fn code(response: &JsonRpcResponse) -> i32 {
    response.error_object().expect("expected an error").code
}

// =============================================================================
// Built-in Methods
// =============================================================================

#[test]
fn test_ping() {
    let response = send(&dispatcher(), r#"{"jsonrpc":"2.0","id":"1","method":"ping"}"#);
    assert_eq!(
        wire(&response),
        json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": { "pong": true, "timestamp": 1_705_282_200_000_i64 }
        })
    );
}

#[test]
fn test_server_info() {
    let response = send(&dispatcher(), r#"{"jsonrpc":"2.0","id":2,"method":"server/info"}"#);
    let result = response.result().unwrap();
    assert_eq!(result["name"], "fetch-time-mcp");
    assert_eq!(result["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        result["capabilities"],
        json!({ "tools": true, "websocket": true, "caching": false })
    );
}

#[test]
fn test_tools_list_matches_registry() {
    let dispatcher = dispatcher();
    let response = send(&dispatcher, r#"{"jsonrpc":"2.0","id":"l","method":"tools/list"}"#);
    let tools = response.result().unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), dispatcher.registry().len());

    let convert = tools
        .iter()
        .find(|t| t["name"] == "convert_timezone")
        .unwrap();
    assert_eq!(convert["cacheable"], true);
    assert_eq!(convert["cacheTTL"], 300);
    assert_eq!(convert["category"], "time");
    assert_eq!(convert["version"], "1.0.0");
    assert_eq!(convert["parameters"]["type"], "object");

    let astro = tools
        .iter()
        .find(|t| t["name"] == "get_astronomical_info")
        .unwrap();
    assert_eq!(astro["category"], "astronomy");
    assert_eq!(
        astro["parameters"]["required"],
        json!(["latitude", "longitude", "date"])
    );
}

// =============================================================================
// Tool Execution
// =============================================================================

#[test]
fn test_current_time_in_tokyo() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"2","method":"tools/get_current_time","params":{"timezone":"Asia/Tokyo"}}"#,
    );
    assert!(response.is_success());
    let result = response.result().unwrap();
    assert_eq!(result["timezone"], "Asia/Tokyo");
    assert_eq!(result["timestamp"], "2024-01-15T10:30:00+09:00");
}

#[test]
fn test_current_time_without_params() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"2b","method":"tools/get_current_time"}"#,
    );
    assert_eq!(response.result().unwrap()["timezone"], "UTC");
}

#[test]
fn test_metadata_stays_off_the_wire() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"m","method":"tools/get_current_time","params":{}}"#,
    );
    let result = response.result().unwrap();
    assert!(result.get("metadata").is_none());
    assert!(result.get("timezone_valid").is_none());
    assert!(result.get("execution_time").is_none());
}

#[test]
fn test_invalid_timezone() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"3","method":"tools/get_current_time","params":{"timezone":"Mars/Olympus"}}"#,
    );
    assert_eq!(code(&response), ErrorCode::TimezoneError.code());
    assert_eq!(
        response.error_object().unwrap().message,
        "Invalid timezone: Mars/Olympus"
    );
}

#[test]
fn test_convert_timezone() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"c","method":"tools/convert_timezone","params":{
            "datetime":"2024-07-01T09:00:00","from_timezone":"Europe/London","to_timezone":"America/Los_Angeles"}}"#,
    );
    let target = &response.result().unwrap()["target"];
    assert_eq!(target["datetime"], "2024-07-01T01:00:00-07:00");
    assert_eq!(target["time_difference"]["offset_difference"], "-8h");
}

#[test]
fn test_religious_calendar() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"r","method":"tools/get_religious_calendar","params":{"date":"2024-03-11","calendar_type":"islamic"}}"#,
    );
    let converted = &response.result().unwrap()["converted_date"];
    assert_eq!(converted["formatted"], "AH 1445/Ramadan/1");
}

#[test]
fn test_religious_calendar_null_params() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"r0","method":"tools/get_religious_calendar"}"#,
    );
    assert_eq!(code(&response), ErrorCode::InvalidParams.code());
}

#[test]
fn test_astronomical_range_check() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"a","method":"tools/get_astronomical_info","params":{"latitude":-91,"longitude":0,"date":"2024-01-15"}}"#,
    );
    assert_eq!(code(&response), ErrorCode::InvalidParams.code());
}

// =============================================================================
// Protocol Errors
// =============================================================================

#[test]
fn test_wrong_version() {
    let response = send(&dispatcher(), r#"{"jsonrpc":"1.0","id":"3","method":"ping"}"#);
    assert_eq!(code(&response), ErrorCode::InvalidRequest.code());
    assert_eq!(response.id(), Some(&RequestId::from("3")));
}

#[test]
fn test_missing_id_is_invalid() {
    let response = send(&dispatcher(), r#"{"jsonrpc":"2.0","method":"ping"}"#);
    assert_eq!(code(&response), ErrorCode::InvalidRequest.code());
}

#[test]
fn test_unknown_tool() {
    let response = send(
        &dispatcher(),
        r#"{"jsonrpc":"2.0","id":"4","method":"tools/nonexistent"}"#,
    );
    assert_eq!(code(&response), ErrorCode::MethodNotFound.code());
    assert!(response
        .error_object()
        .unwrap()
        .message
        .contains("nonexistent"));
}

#[test]
fn test_unknown_method() {
    let response = send(&dispatcher(), r#"{"jsonrpc":"2.0","id":"5","method":"time/now"}"#);
    assert_eq!(code(&response), ErrorCode::MethodNotFound.code());
}

#[test]
fn test_parse_error() {
    let response = send(&dispatcher(), "{oops");
    assert_eq!(code(&response), ErrorCode::ParseError.code());
    assert!(wire(&response).get("id").is_none());
}

// =============================================================================
// Envelope Encoding
// =============================================================================

#[test]
fn test_response_round_trip_keeps_id_and_shape() {
    let dispatcher = dispatcher();
    for json in [
        r#"{"jsonrpc":"2.0","id":"1","method":"ping"}"#,
        r#"{"jsonrpc":"2.0","id":77,"method":"tools/nonexistent"}"#,
    ] {
        let response = send(&dispatcher, json);
        let text = serde_json::to_string(&response).unwrap();
        let decoded: JsonRpcResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.id(), response.id());
        assert_ne!(decoded.is_success(), decoded.is_error());
        assert_eq!(decoded, response);
    }
}
