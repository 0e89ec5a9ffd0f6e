use std::sync::Arc;

use tokio::{sync::broadcast::error::RecvError, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    actor::HubActor,
    config::Config,
    hub::{Hub, HubHandle},
    state::HubState,
};
use crate::{
    events::{Bus, Event},
    persistence::{Persistence, PersistenceQueue},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Hub`] with optional features.
pub struct HubBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl HubBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            persistence: None,
        }
    }

    /// Sets runtime event subscribers for observability.
    ///
    /// Subscribers receive runtime events (session lifecycle, rejections, evictions, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the persistence backend. Without one, committed state is only kept in memory.
    pub fn with_persistence(mut self, backend: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(backend);
        self
    }

    /// Builds and starts the hub.
    ///
    /// Must be called from within a tokio runtime. Initializes:
    /// - Event bus and the listener feeding the subscriber workers
    /// - Persistence queue (if a backend was set)
    /// - The hub actor
    pub fn build(self) -> Hub {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        debug!(
            subscribers = subs.len(),
            persistence = self.persistence.is_some(),
            "hub starting"
        );
        let listener_token = CancellationToken::new();
        let listener = subscriber_listener(&bus, subs, listener_token.clone());

        let persistence = self.persistence.map(|backend| {
            PersistenceQueue::spawn(
                backend,
                self.cfg.persistence_queue_capacity_clamped(),
                bus.clone(),
            )
        });

        let state = HubState::new(&self.cfg, bus, persistence);
        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let actor = tokio::spawn(HubActor::new(state, rx).run(runtime_token.clone()));

        Hub::new_internal(
            HubHandle::new(tx),
            runtime_token,
            listener_token,
            actor,
            listener,
        )
    }
}

/// Forwards bus events to the subscriber set until cancelled, then drains and
/// shuts the set down.
///
/// Subscribes before spawning so nothing published after `build` is missed.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged");
                        set.emit(&Event::subscriber_overflow("listener", "lagged"));
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    })
}
