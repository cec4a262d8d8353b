//! HTTP transport tests.
//!
//! Plain HTTP requests drive the router in-process with
//! `tower::ServiceExt::oneshot`. WebSocket sessions bind the router on an
//! ephemeral loopback port and connect a real client.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use fetch_time_mcp::config::ServerConfig;
use fetch_time_mcp::mcp::http::{router, AppState};
use fetch_time_mcp::mcp::protocol::ErrorCode;
use fetch_time_mcp::mcp::{Dispatcher, ServerCapabilities, ToolRegistry};
use fetch_time_mcp::services::{Clock, SystemClock};
use fetch_time_mcp::tools::register_default_tools;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const PINGS: i64 = 20;

fn dispatcher() -> Arc<Dispatcher> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(ToolRegistry::new());
    register_default_tools(&registry, &clock).unwrap();
    Arc::new(Dispatcher::new(registry, ServerCapabilities::default()))
}

fn app(config: &ServerConfig) -> Router {
    let (_tx, rx) = watch::channel(false);
    router(AppState::new(dispatcher(), config, rx), config)
}

/// Serves the router on a loopback port; the sender closes open sessions.
async fn listen(config: ServerConfig) -> (SocketAddr, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    let app = router(AppState::new(dispatcher(), &config, rx), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, tx)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/mcp/ws")).await.unwrap();
    client
}

/// The next text frame, parsed.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// `true` if the server ends the session within `limit`.
async fn closes_within(client: &mut Client, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return false,
            Ok(Some(Ok(Message::Close(_)) | Err(_)) | None) => return true,
            Ok(Some(Ok(_))) => {}
        }
    }
}

fn post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_ping_over_http() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post(
            "/mcp",
            "application/json",
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["pong"], true);
}

#[tokio::test]
async fn test_sub_paths_share_the_endpoint() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post(
            "/mcp/tools",
            "application/json; charset=utf-8",
            r#"{"jsonrpc":"2.0","id":"t","method":"tools/list"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_tool_over_http() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post(
            "/mcp",
            "application/json",
            r#"{"jsonrpc":"2.0","id":"z","method":"tools/get_current_time","params":{"timezone":"Europe/Berlin"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["timezone"], "Europe/Berlin");
}

#[tokio::test]
async fn test_get_on_rpc_endpoint_is_not_allowed() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/mcp")
        .body(Body::empty())
        .unwrap();
    let response = app(&ServerConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_post_to_websocket_path_is_rpc() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post(
            "/mcp/ws",
            "application/json",
            r#"{"jsonrpc":"2.0","id":"w","method":"ping"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "w");
    assert_eq!(body["result"]["pong"], true);
}

#[tokio::test]
async fn test_websocket_route_absent_when_disabled() {
    let config = ServerConfig {
        enable_websocket: false,
        ..ServerConfig::default()
    };
    let request = Request::builder()
        .method(Method::GET)
        .uri("/mcp/ws")
        .body(Body::empty())
        .unwrap();
    let response = app(&config).oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert!(response.status().is_client_error());
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_wrong_content_type() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post("/mcp", "text/plain", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Content-Type must be application/json" }));
}

#[tokio::test]
async fn test_malformed_body_is_a_protocol_error() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post("/mcp", "application/json", "{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], ErrorCode::ParseError.code());
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_tool_error_keeps_http_ok() {
    let (status, body) = call(
        app(&ServerConfig::default()),
        post(
            "/mcp",
            "application/json",
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/get_current_time","params":{"timezone":"Mars/Olympus"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 9);
    assert_eq!(body["error"]["code"], ErrorCode::TimezoneError.code());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = ServerConfig {
        max_message_size: 64,
        ..ServerConfig::default()
    };
    let padding = "x".repeat(256);
    let body = format!(r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{padding}"}}}}"#);
    let response = app(&config)
        .oneshot(post("/mcp", "application/json", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// WebSocket Sessions
// =============================================================================

#[tokio::test]
async fn test_websocket_greeting_then_pipelined_frames() {
    // A small in-flight cap makes later frames wait for earlier dispatches
    let config = ServerConfig {
        max_connections: 2,
        ..ServerConfig::default()
    };
    let (addr, _shutdown) = listen(config).await;
    let mut client = connect(addr).await;

    let greeting = next_json(&mut client).await;
    assert_eq!(greeting["id"], "connection");
    assert_eq!(greeting["result"]["status"], "connected");
    assert_eq!(greeting["result"]["protocol"], "MCP/2.0");

    for id in 0..PINGS {
        let frame = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"ping"}}"#);
        client.send(Message::text(frame)).await.unwrap();
    }
    client.send(Message::text("not json".to_string())).await.unwrap();

    let mut ids = HashSet::new();
    let mut parse_errors = 0;
    for _ in 0..=PINGS {
        let reply = next_json(&mut client).await;
        if reply["error"]["code"] == ErrorCode::ParseError.code() {
            assert!(reply.get("id").is_none());
            parse_errors += 1;
        } else {
            assert_eq!(reply["result"]["pong"], true);
            ids.insert(reply["id"].as_i64().unwrap());
        }
    }
    assert_eq!(parse_errors, 1);
    assert_eq!(ids, (0..PINGS).collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_websocket_binary_frames_are_ignored() {
    let (addr, _shutdown) = listen(ServerConfig::default()).await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    client.send(Message::binary(vec![1_u8, 2, 3])).await.unwrap();
    let frame = r#"{"jsonrpc":"2.0","id":"after","method":"ping"}"#.to_string();
    client.send(Message::text(frame)).await.unwrap();

    let reply = next_json(&mut client).await;
    assert_eq!(reply["id"], "after");
}

#[tokio::test]
async fn test_websocket_idle_session_is_closed() {
    let config = ServerConfig {
        idle_timeout_ms: 300,
        ..ServerConfig::default()
    };
    let (addr, _shutdown) = listen(config).await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    let started = Instant::now();
    assert!(closes_within(&mut client, WAIT).await);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_websocket_sessions_close_on_shutdown() {
    let (addr, shutdown) = listen(ServerConfig::default()).await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string();
    client.send(Message::text(frame)).await.unwrap();
    assert_eq!(next_json(&mut client).await["id"], 1);

    shutdown.send_replace(true);
    assert!(closes_within(&mut client, WAIT).await);
}
