//! # axum transport adapter (feature `server`).
//!
//! Binds the hub to HTTP and WebSocket. The adapter owns no state of its own:
//! every request becomes one [`HubHandle`] call, and every WebSocket
//! connection is a [`ConnectionId`](crate::ConnectionId) in the hub's registrar.
//!
//! ## Routes
//! ```text
//! POST /device/session/start ─► HubHandle::start_session
//! POST /device/session/stop  ─► HubHandle::stop_session
//! POST /device/detection     ─► HubHandle::submit_detection
//! GET  /device/live          ─► HubHandle::status
//! GET  /device/ws            ─► WebSocket (register / detection / get_live / ping)
//! GET  /health               ─► HubHandle::status (503 once the hub is closed)
//! ```

mod http;
mod protocol;
mod ws;

use std::future::Future;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::HubHandle;

pub use http::ApiError;
pub use protocol::{ClientMessage, ProtocolError, ServerReply, WireRole};

/// Shared state passed to handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    /// Cancelled on shutdown; closes open WebSockets.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Builds the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/device/session/start", post(http::start_session))
        .route("/device/session/stop", post(http::stop_session))
        .route("/device/detection", post(http::detection))
        .route("/device/live", get(http::live))
        .route("/device/ws", get(ws::upgrade))
        .route("/health", get(http::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serves until `signal` resolves, then closes WebSockets and drains requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = state.shutdown.clone();
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            token.cancel();
        })
        .await
}
