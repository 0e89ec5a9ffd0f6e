//! # State owned by the hub actor.
//!
//! [`HubState`] bundles every mutable piece of the core. Exactly one instance
//! exists per hub and only the actor task touches it, so no method here needs
//! a lock.
//!
//! ## Contents
//! ```text
//! HubState
//!   ├─ SessionStore        (current LiveSession)
//!   ├─ Aggregator          (delta validation + folding)
//!   ├─ Registrar           (roles, producer slot)
//!   ├─ BroadcastHub        (observer queues)
//!   ├─ PersistenceQueue?   (fire-and-forget backend writes)
//!   └─ Bus                 (runtime events)
//! ```
//!
//! Lifecycle transitions live in [`lifecycle`](super::lifecycle).

use tracing::warn;

use super::config::Config;
use crate::{
    broadcast::{BroadcastHub, Delivery, ObserverMessage, StatusEvent},
    connections::Registrar,
    detection::Aggregator,
    events::{Bus, Event, EventKind},
    persistence::{PersistOp, PersistenceQueue},
    session::SessionStore,
};

pub(crate) struct HubState {
    pub(super) store: SessionStore,
    pub(super) aggregator: Aggregator,
    pub(super) registrar: Registrar,
    pub(super) broadcast: BroadcastHub,
    pub(super) persistence: Option<PersistenceQueue>,
    pub(super) bus: Bus,
}

impl HubState {
    pub(crate) fn new(cfg: &Config, bus: Bus, persistence: Option<PersistenceQueue>) -> Self {
        Self {
            store: SessionStore::new(),
            aggregator: Aggregator::new(),
            registrar: Registrar::new(),
            broadcast: BroadcastHub::new(
                cfg.observer_queue_capacity_clamped(),
                cfg.max_observer_drops_clamped(),
            ),
            persistence,
            bus,
        }
    }

    /// A producer currently holds the slot.
    #[inline]
    pub(super) fn producer_connected(&self) -> bool {
        self.registrar.producer().is_some()
    }

    /// Snapshot a new observer sees before anything live: session, then presence.
    pub(super) fn baseline(&self) -> Vec<ObserverMessage> {
        vec![
            ObserverMessage::SessionStats(self.store.current()),
            ObserverMessage::DetectorStatus(StatusEvent::now(self.producer_connected())),
        ]
    }

    /// Tells every observer about a presence change.
    pub(super) fn publish_status(&mut self, connected: bool) {
        let delivery = self.broadcast.publish_status(&StatusEvent::now(connected));
        self.handle_evictions(delivery);
    }

    /// Unregisters observers the broadcast hub gave up on.
    pub(super) fn handle_evictions(&mut self, delivery: Delivery) {
        for id in delivery.evicted {
            self.registrar.unregister(&id);
            warn!(connection = %id, "observer evicted: queue overflow or closed");
            self.bus
                .publish(Event::new(EventKind::ObserverEvicted).with_connection(&id));
        }
    }

    /// Hands `op` to the persistence worker, if one is configured.
    pub(super) fn persist(&self, op: PersistOp) {
        if let Some(queue) = &self.persistence {
            queue.submit(op);
        }
    }

    /// Ends every observer stream and drains pending persistence.
    pub(crate) async fn shutdown(mut self) {
        self.broadcast.clear();
        if let Some(queue) = self.persistence.take() {
            queue.shutdown().await;
        }
    }
}
