//! WebSocket endpoint: one task pair per connection.
//!
//! ```text
//! socket ──split──► reader (this task) ── ClientMessage ──► HubHandle
//!                     │                                        │
//!                     └── ServerReply ─┐      ObserverStream ◄─┘ (dashboards)
//!                                      ▼             │
//!                                 [outbound mpsc] ◄──┘ forwarder task
//!                                      │
//!                                      ▼
//!                                 writer task ──► socket (+ periodic ping)
//! ```
//!
//! The connection ends when the socket closes, a read fails, the observer
//! stream ends (eviction) or the server shuts down. In every case the hub is
//! told via [`HubHandle::disconnect`](crate::HubHandle::disconnect).

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    AppState,
    protocol::{ClientMessage, ServerReply, WireRole},
};
use crate::{
    HubHandle,
    broadcast::ObserverStream,
    connections::ConnectionId,
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const OUTBOUND_CAPACITY: usize = 64;

pub(super) async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnectionId::generate();
    if state.hub.connect(&id).await.is_err() {
        return;
    }
    info!(connection = %id, "websocket connected");

    let (ws_tx, mut ws_rx) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    let conn_token = state.shutdown.child_token();
    let writer = tokio::spawn(write_loop(ws_tx, out_rx, conn_token.clone()));
    let mut forwarder: Option<JoinHandle<()>> = None;

    loop {
        let frame = tokio::select! {
            _ = conn_token.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                debug!(connection = %id, error = %err, "websocket read failed");
                break;
            }
        };

        let msg = match ClientMessage::parse(text.as_str()) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(connection = %id, error = err.as_label(), "bad frame");
                send(&out_tx, &ServerReply::from(&err)).await;
                continue;
            }
        };

        if let Some(reply) = dispatch(&state.hub, &id, msg, &out_tx, &conn_token, &mut forwarder).await {
            send(&out_tx, &reply).await;
        }
    }

    conn_token.cancel();
    if let Some(forwarder) = forwarder {
        forwarder.abort();
    }
    drop(out_tx);
    let _ = writer.await;

    if let Ok(departure) = state.hub.disconnect(&id).await {
        if departure.was_producer {
            warn!(connection = %id, "detector disconnected");
        }
    }
    info!(connection = %id, "websocket disconnected");
}

/// Applies one inbound message. Returns the reply to send back, if any.
async fn dispatch(
    hub: &HubHandle,
    id: &ConnectionId,
    msg: ClientMessage,
    out_tx: &mpsc::Sender<String>,
    conn_token: &CancellationToken,
    forwarder: &mut Option<JoinHandle<()>>,
) -> Option<ServerReply> {
    match msg {
        ClientMessage::Register(role @ WireRole::Detector) => match hub.register_producer(id).await {
            Ok(start) => {
                info!(connection = %id, session = %start.session.session_id, "detector registered");
                Some(ServerReply::Registered { role })
            }
            Err(err) => Some(ServerReply::error(&err)),
        },
        ClientMessage::Register(role @ WireRole::Dashboard) => match hub.register_observer(id).await {
            Ok(stream) => {
                info!(connection = %id, "dashboard registered");
                // Acknowledge before the feed starts: `registered`, then the baseline.
                send(out_tx, &ServerReply::Registered { role }).await;
                if let Some(old) = forwarder.replace(tokio::spawn(forward_loop(
                    stream,
                    out_tx.clone(),
                    conn_token.clone(),
                ))) {
                    old.abort();
                }
                None
            }
            Err(err) => Some(ServerReply::error(&err)),
        },
        ClientMessage::Detection(event) => match hub.submit_detection_from(id, event).await {
            Ok(_) => None,
            Err(err) => Some(ServerReply::error(&err)),
        },
        ClientMessage::GetLive => match hub.resync(id).await {
            Ok(true) => None,
            Ok(false) => match hub.current().await {
                Ok(session) => Some(ServerReply::SessionStats(session)),
                Err(err) => Some(ServerReply::error(&err)),
            },
            Err(err) => Some(ServerReply::error(&err)),
        },
        ClientMessage::Ping => Some(ServerReply::pong()),
    }
}

/// Copies observer messages to the outbound queue; ends the connection when the
/// stream ends (eviction or hub shutdown).
async fn forward_loop(mut stream: ObserverStream, out_tx: mpsc::Sender<String>, conn_token: CancellationToken) {
    while let Some(msg) = stream.recv().await {
        let Ok(text) = serde_json::to_string(msg.as_ref()) else {
            continue;
        };
        if out_tx.send(text).await.is_err() {
            return;
        }
    }
    debug!(connection = %stream.id(), "observer stream ended");
    conn_token.cancel();
}

async fn write_loop(
    mut ws_tx: futures::stream::SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<String>,
    conn_token: CancellationToken,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            msg = out_rx.recv() => match msg {
                Some(text) => {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = heartbeat.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = ws_tx.close().await;
    conn_token.cancel();
}

async fn send(out_tx: &mpsc::Sender<String>, reply: &impl Serialize) {
    if let Ok(text) = serde_json::to_string(reply) {
        let _ = out_tx.send(text).await;
    }
}
