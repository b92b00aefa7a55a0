//! Bridge request handlers: JSON-RPC, health and host events.

use crate::server::{BridgeState, WindowSignal};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    /// `result` is always serialized, so a cancelled dialog reads as `null`.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// Health check endpoint of the bridge server itself.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<BridgeState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                -32600,
                format!("Invalid request: unsupported jsonrpc version {:?}", request.jsonrpc),
            )),
        );
    }

    let method = request.method.as_str();
    let params = request.params.unwrap_or(Value::Null);
    debug!("RPC call: {}({:?})", method, params);

    match state.bridge.call(method, params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

/// Reports a connected event stream until it is dropped.
struct Presence(mpsc::UnboundedSender<WindowSignal>);

impl Presence {
    fn connect(tx: mpsc::UnboundedSender<WindowSignal>) -> Self {
        let _ = tx.send(WindowSignal::Connected);
        Self(tx)
    }
}

impl Drop for Presence {
    fn drop(&mut self) {
        let _ = self.0.send(WindowSignal::Disconnected);
    }
}

/// Server-sent stream of host events, one SSE event per [`HostEvent`].
///
/// The stream lives as long as the window keeps it open, so its lifetime is
/// also reported as window presence.
///
/// [`HostEvent`]: doctorino_core::HostEvent
pub async fn handle_events(
    State(state): State<Arc<BridgeState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let presence = Presence::connect(state.window_signals.clone());
    let stream = stream::unfold((rx, presence), |(mut rx, presence)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.kind()).json_data(&event) {
                    Ok(sse) => return Some((Ok(sse), (rx, presence))),
                    Err(e) => warn!("Failed to encode {} event: {}", event.kind(), e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
