//! Local bridge server using Axum.
//!
//! Serves the JSON-RPC endpoint for bridged calls, the host event stream and,
//! in packaged builds, the front-end bundle itself.

use crate::handler::{handle_events, handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use doctorino_core::{Bridge, EventBus};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Presence of the window, as seen through its event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    Connected,
    Disconnected,
}

/// State shared across handlers.
pub struct BridgeState {
    pub bridge: Bridge,
    pub events: EventBus,
    pub window_signals: mpsc::UnboundedSender<WindowSignal>,
}

/// Build the router. `bundle_dir` is served at `/` when set.
pub fn router(state: BridgeState, bundle_dir: Option<PathBuf>) -> Router {
    // The development server runs on another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .route("/events", get(handle_events));

    if let Some(dir) = bundle_dir {
        info!("Serving front-end bundle from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the bridge server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    state: BridgeState,
    bundle_dir: Option<PathBuf>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = router(state, bundle_dir);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Bridge server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Bridge server error: {}", e);
        }
    });

    Ok(actual_addr)
}
