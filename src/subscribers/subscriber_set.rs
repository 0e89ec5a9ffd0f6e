//! # Runtime-event delivery to hub subscribers.
//!
//! The bus listener hands every hub event (session started, detection recorded,
//! producer lost, observer evicted, ...) to [`SubscriberSet::emit`]. Each
//! subscriber owns a bounded queue drained by its own worker, so a slow log
//! sink or audit hook never holds up the listener, let alone the hub actor.
//!
//! ```text
//! bus listener ── emit(ev) ──┬──► [queue] ──► worker ──► LogWriter::on_event
//!                            └──► [queue] ──► worker ──► custom::on_event
//!                                                 └──► panic ─► SubscriberPanicked
//! ```
//!
//! - Each subscriber sees events in bus order; subscribers are not ordered
//!   relative to each other.
//! - A full or closed queue drops the event for that subscriber and publishes
//!   `SubscriberOverflow`, except for overflow events themselves.
//! - A panicking handler is reported as `SubscriberPanicked` and its worker keeps going.
//!
//! `AssertUnwindSafe` wraps each handler call: a subscriber that panics while
//! holding a lock may leave its own state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for runtime event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(run_worker(sub, rx, bus.clone()));
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers (one shared allocation).
    ///
    /// `SubscriberOverflow` events are never re-published when they themselves overflow.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers drain and see channel closed)
    /// 2. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Drains one subscriber queue until every sender is gone.
async fn run_worker(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_info(&*payload)));
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_info(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
