//! # Fire-and-forget persistence queue.
//!
//! [`PersistenceQueue`] decouples the hub actor from the storage backend.
//!
//! ## Architecture
//! ```text
//! hub actor (after commit)
//!     └──► submit(op) ── try_send ──► [bounded queue] ──► worker ──► backend.persist_*()
//!                                                            ├─► Err   → PersistenceFailed
//!                                                            └─► panic → PersistenceFailed
//! ```
//!
//! ## Rules
//! - `submit` never waits; a full queue drops the op and reports `PersistenceOverflow`.
//! - Ops reach the backend one at a time in submit order.
//! - Backend errors are logged and reported, never retried here.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use super::port::{PersistOp, Persistence};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_info;

/// Bounded queue + worker in front of a [`Persistence`] backend.
pub struct PersistenceQueue {
    name: &'static str,
    sender: mpsc::Sender<PersistOp>,
    worker: JoinHandle<()>,
    bus: Bus,
}

impl PersistenceQueue {
    /// Spawns the worker. Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<dyn Persistence>, capacity: usize, bus: Bus) -> Self {
        let name = backend.name();
        let (sender, mut rx) = mpsc::channel::<PersistOp>(capacity.max(1));
        let worker_bus = bus.clone();

        let worker = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let fut = op.apply(backend.as_ref());
                let reason = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => e.to_string(),
                    Err(panic_err) => format!("panic: {}", panic_info(&*panic_err)),
                };
                warn!(
                    backend = name,
                    op = op.as_label(),
                    session = %op.session_id(),
                    error = %reason,
                    "persistence failed"
                );
                worker_bus.publish(
                    Event::new(EventKind::PersistenceFailed)
                        .with_session_id(op.session_id())
                        .with_reason(format!("{}: {reason}", op.as_label())),
                );
            }
        });

        Self {
            name,
            sender,
            worker,
            bus,
        }
    }

    /// Enqueues `op` without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, op: PersistOp) -> bool {
        let label = op.as_label();
        match self.sender.try_send(op) {
            Ok(()) => true,
            Err(e) => {
                let why = match e {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                warn!(backend = self.name, op = label, queue = why, "persistence op dropped");
                self.bus.publish(
                    Event::new(EventKind::PersistenceOverflow).with_reason(format!("{label}: {why}")),
                );
                false
            }
        }
    }

    /// Closes the queue and waits until the worker drained it.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.await;
    }
}
