//! HTTP and WebSocket transport.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/mcp`, `/mcp/{*path}` | POST | One JSON-RPC request per body |
//! | `/mcp/ws` | GET | WebSocket session, one request per text frame |
//!
//! `POST /mcp/ws` is answered like any other sub-path. Each WebSocket session
//! runs at most `max_connections` dispatches at once; further frames wait.
//!
//! HTTP replies are always `200` with a JSON-RPC envelope, except for a
//! missing JSON content type (`400`) and a failed dispatch task (`500`),
//! which carry a bare `{"error": ...}` body.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{
    decode_request, ErrorCode, JsonRpcError, JsonRpcResponse, RequestId, WIRE_PROTOCOL,
};

const INTERNAL_ERROR_LINE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"}}"#;

// Replies waiting for the WebSocket writer
const REPLY_QUEUE: usize = 64;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
    max_message_size: usize,
    max_in_flight: usize,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Bundles the dispatcher with the session settings from `config`.
    ///
    /// WebSocket sessions close when `shutdown` turns `true`.
    #[must_use]
    pub const fn new(
        dispatcher: Arc<Dispatcher>,
        config: &ServerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            dispatcher,
            idle_timeout: config.idle_timeout(),
            max_message_size: config.max_message_size,
            max_in_flight: config.max_connections,
            shutdown,
        }
    }
}

/// Builds the router with body, concurrency, panic and trace layers.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/mcp", post(handle_rpc))
        .route("/mcp/{*path}", post(handle_rpc));

    if config.enable_websocket {
        app = app.route("/mcp/ws", get(handle_ws).post(handle_rpc));
    }

    with_layers(app.with_state(state), config)
}

fn with_layers(app: Router, config: &ServerConfig) -> Router {
    app.layer(GlobalConcurrencyLimitLayer::new(config.max_connections))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_message_size))
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be resolved or bound, or if the
/// server fails while running.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> Result<(), ServerError> {
    let addr = resolve(config).await?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(dispatcher, config, shutdown_rx);
    let app = router(state, config);

    info!(%addr, websocket = config.enable_websocket, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutting down gracefully");
            shutdown_tx.send_replace(true);
        })
        .await?;

    Ok(())
}

async fn resolve(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let target = format!("{}:{}", config.host, config.port);
    tokio::net::lookup_host(target.as_str())
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or(ServerError::Address(target))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[allow(clippy::needless_pass_by_value)] // CatchPanicLayer hands over the boxed payload by value
fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    error!("HTTP handler panicked");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// `true` if the media type is `application/json`, ignoring parameters such as `charset`.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn dispatch(dispatcher: &Dispatcher, body: &[u8]) -> JsonRpcResponse {
    let Ok(text) = std::str::from_utf8(body) else {
        return JsonRpcResponse::error(None, JsonRpcError::parse_error("body is not UTF-8"));
    };
    match decode_request(text) {
        Ok(request) => dispatcher.process(&request),
        Err(response) => response,
    }
}

fn encode(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialise response");
        INTERNAL_ERROR_LINE.to_string()
    })
}

async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !is_json(&headers) {
        debug!("Rejected request without a JSON content type");
        return error_body(
            StatusCode::BAD_REQUEST,
            "Content-Type must be application/json",
        );
    }

    let dispatcher = Arc::clone(&state.dispatcher);
    match tokio::task::spawn_blocking(move || dispatch(&dispatcher, &body)).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(error = %e, "HTTP dispatch task failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| session(socket, state))
}

/// The envelope pushed to a client as soon as it connects.
#[must_use]
pub fn connection_envelope(timestamp_millis: i64) -> JsonRpcResponse {
    JsonRpcResponse::success(
        Some(RequestId::from("connection")),
        json!({
            "status": "connected",
            "protocol": WIRE_PROTOCOL,
            "timestamp": timestamp_millis,
        }),
    )
}

async fn session(mut socket: WebSocket, state: AppState) {
    info!("WebSocket session opened");

    let greeting = connection_envelope(state.dispatcher.clock().now().timestamp_millis());
    if socket
        .send(Message::Text(encode(&greeting).into()))
        .await
        .is_err()
    {
        debug!("WebSocket closed before greeting was sent");
        return;
    }

    let (tx, mut rx) = mpsc::channel::<String>(REPLY_QUEUE);
    let in_flight = Arc::new(Semaphore::new(state.max_in_flight.min(Semaphore::MAX_PERMITS)));
    let mut shutdown = state.shutdown.clone();
    let idle = tokio::time::sleep(state.idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            () = &mut idle => {
                info!(timeout_ms = state.idle_timeout.as_millis(), "Closing idle WebSocket session");
                break;
            }

            Ok(()) = shutdown.changed() => {
                info!("Closing WebSocket session for shutdown");
                break;
            }

            Some(reply) = rx.recv() => {
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    debug!("WebSocket closed while sending a reply");
                    break;
                }
            }

            frame = socket.recv() => {
                idle.as_mut().reset(Instant::now() + state.idle_timeout);
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(permit) = Arc::clone(&in_flight).acquire_owned().await else {
                            break;
                        };
                        spawn_reply(&state.dispatcher, text.as_str().to_owned(), permit, tx.clone());
                    }
                    Some(Ok(Message::Binary(_))) => debug!("Ignoring binary WebSocket frame"),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive failed");
                        break;
                    }
                }
            }
        }
    }

    socket.send(Message::Close(None)).await.ok();
    info!("WebSocket session closed");
}

// Each frame gets its own task; replies funnel back through `tx` to the single writer.
// The permit is released once dispatch finishes, before the reply is queued.
fn spawn_reply(
    dispatcher: &Arc<Dispatcher>,
    text: String,
    permit: OwnedSemaphorePermit,
    tx: mpsc::Sender<String>,
) {
    let dispatcher = Arc::clone(dispatcher);
    tokio::spawn(async move {
        let reply = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            frame_reply(&dispatcher, &text)
        })
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "WebSocket dispatch task failed");
            encode(&JsonRpcResponse::error_with(
                None,
                ErrorCode::InternalError,
                "Internal error",
            ))
        });
        if tx.send(reply).await.is_err() {
            debug!("WebSocket closed before a reply was sent");
        }
    });
}

/// Answers one WebSocket text frame with an encoded response.
#[must_use]
pub fn frame_reply(dispatcher: &Dispatcher, text: &str) -> String {
    encode(&dispatch(dispatcher, text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::dispatcher::ServerCapabilities;
    use crate::mcp::registry::ToolRegistry;
    use axum::http::HeaderValue;
    use serde_json::Value;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn json_media_type_detection() {
        assert!(is_json(&headers("application/json")));
        assert!(is_json(&headers("application/json; charset=utf-8")));
        assert!(is_json(&headers("Application/JSON")));
        assert!(!is_json(&headers("text/plain")));
        assert!(!is_json(&headers("application/jsonp")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn frames_decode_and_dispatch() {
        let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()), ServerCapabilities::default());

        let reply: Value =
            serde_json::from_str(&frame_reply(&dispatcher, r#"{"jsonrpc":"2.0","id":"1","method":"ping"}"#))
                .unwrap();
        assert_eq!(reply["id"], "1");
        assert_eq!(reply["result"]["pong"], true);

        let reply: Value = serde_json::from_str(&frame_reply(&dispatcher, "garbage")).unwrap();
        assert_eq!(reply["error"]["code"], -32700);
        assert!(reply.get("id").is_none());
    }

    #[test]
    fn greeting_shape() {
        let envelope = connection_envelope(1_700_000_000_000);
        assert_eq!(envelope.id(), Some(&RequestId::from("connection")));
        let result = envelope.result().unwrap();
        assert_eq!(result["status"], "connected");
        assert_eq!(result["protocol"], "MCP/2.0");
        assert_eq!(result["timestamp"], 1_700_000_000_000_i64);
    }

    async fn explode() -> StatusCode {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn handler_panic_becomes_bare_500() {
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use tower::ServiceExt;

        let app = with_layers(
            Router::new().route("/boom", post(explode)),
            &ServerConfig::default(),
        );
        let request = Request::post("/boom").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn fallback_line_is_valid_json() {
        let value: Value = serde_json::from_str(INTERNAL_ERROR_LINE).unwrap();
        assert_eq!(value["error"]["code"], ErrorCode::InternalError.code());
    }
}
