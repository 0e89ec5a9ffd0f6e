//! # Hub actor: the single serialization point.
//!
//! [`HubActor`] owns [`HubState`] and applies [`Command`]s one at a time, in
//! arrival order. Every reply is sent after the command is fully applied, so a
//! read never observes a half-applied mutation.
//!
//! ## Architecture
//! ```text
//! HubHandle (clone) ─┐
//! HubHandle (clone) ─┼── Command{.., reply: oneshot} ──► [bounded mpsc] ──► HubActor::run()
//! HubHandle (clone) ─┘                                                        │
//!                                                          apply(cmd) ◄───────┘
//!                                                              ├─► HubState (mutate)
//!                                                              ├─► BroadcastHub (try_send only)
//!                                                              ├─► PersistenceQueue (try_send only)
//!                                                              └─► reply.send(result)
//! ```
//!
//! ## Rules
//! - No `.await` between receiving a command and replying to it.
//! - Exits on cancellation or when every handle is gone; then ends all
//!   observer streams and drains the persistence queue.
//! - A caller that stopped waiting does not undo its command.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    lifecycle::{Departure, HubStatus, SessionStart, StopReason},
    state::HubState,
};
use crate::{
    broadcast::ObserverStream,
    connections::ConnectionId,
    detection::{DetectionEvent, DetectionRecord},
    error::HubError,
    session::LiveSession,
};

/// Requests understood by the actor.
pub(crate) enum Command {
    StartSession {
        reply: oneshot::Sender<SessionStart>,
    },
    StopSession {
        reply: oneshot::Sender<Option<LiveSession>>,
    },
    SubmitDetection {
        from: Option<ConnectionId>,
        event: DetectionEvent,
        reply: oneshot::Sender<Result<DetectionRecord, HubError>>,
    },
    Connect {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    RegisterProducer {
        id: ConnectionId,
        reply: oneshot::Sender<Result<SessionStart, HubError>>,
    },
    RegisterObserver {
        id: ConnectionId,
        reply: oneshot::Sender<Result<ObserverStream, HubError>>,
    },
    Resync {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Disconnect {
        id: ConnectionId,
        reply: oneshot::Sender<Departure>,
    },
    Current {
        reply: oneshot::Sender<Option<LiveSession>>,
    },
    IsProducer {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<HubStatus>,
    },
}

pub(crate) struct HubActor {
    state: HubState,
    rx: mpsc::Receiver<Command>,
}

impl HubActor {
    pub(crate) fn new(state: HubState, rx: mpsc::Receiver<Command>) -> Self {
        Self { state, rx }
    }

    /// Runs until `token` is cancelled or all senders are dropped.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => break,
                },
            }
        }

        debug!("hub actor stopping");
        // Pending commands fail with `Closed` once their reply senders drop.
        self.rx.close();
        self.state.shutdown().await;
    }

    fn apply(&mut self, cmd: Command) {
        // A dropped receiver means the caller gave up; the command still stands.
        match cmd {
            Command::StartSession { reply } => {
                let _ = reply.send(self.state.start_session());
            }
            Command::StopSession { reply } => {
                let _ = reply.send(self.state.stop_session(StopReason::Command));
            }
            Command::SubmitDetection { from, event, reply } => {
                let _ = reply.send(self.state.submit_detection(from.as_ref(), &event));
            }
            Command::Connect { id, reply } => {
                let _ = reply.send(self.state.connect(id));
            }
            Command::RegisterProducer { id, reply } => {
                let _ = reply.send(self.state.register_producer(&id));
            }
            Command::RegisterObserver { id, reply } => {
                let _ = reply.send(self.state.register_observer(&id));
            }
            Command::Resync { id, reply } => {
                let _ = reply.send(self.state.resync(&id));
            }
            Command::Disconnect { id, reply } => {
                let _ = reply.send(self.state.disconnect(&id));
            }
            Command::Current { reply } => {
                let _ = reply.send(self.state.current());
            }
            Command::IsProducer { id, reply } => {
                let _ = reply.send(self.state.is_producer(&id));
            }
            Command::Status { reply } => {
                let _ = reply.send(self.state.status());
            }
        }
    }
}
