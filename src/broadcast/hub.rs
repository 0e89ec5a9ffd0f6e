//! # Observer fan-out.
//!
//! [`BroadcastHub`] delivers [`ObserverMessage`]s to every attached observer
//! without ever waiting on one of them.
//!
//! ## Architecture
//! ```text
//! publish(msg) ── Arc::new(msg)
//!     │
//!     ├──► try_send ──► [queue 1] ──► ObserverStream 1 ──► adapter ──► socket
//!     ├──► try_send ──► [queue 2] ──► ObserverStream 2 ──► adapter ──► socket
//!     └──► try_send ──► [queue N] ──► ObserverStream N ──► adapter ──► socket
//! ```
//!
//! ## Rules
//! - **Non-blocking**: only `try_send`; a slow observer never stalls the caller.
//! - **Per-observer FIFO**: each queue preserves publish order.
//! - **Baseline first**: [`BroadcastHub::attach`] fills a fresh queue with the baseline
//!   before the observer becomes visible to `publish`.
//! - **Overflow**: the message is dropped for that observer only; after
//!   `max_drops` lifetime drops (or a closed receiver) the observer is evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{
    message::{ObserverMessage, StatusEvent},
    stream::ObserverStream,
};
use crate::{connections::ConnectionId, detection::DetectionRecord};

/// Per-observer queue metadata.
struct ObserverChannel {
    sender: mpsc::Sender<Arc<ObserverMessage>>,
    drops: u64,
}

/// Result of one fan-out.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Observers the message was queued for.
    pub delivered: usize,
    /// Observers whose queue was full (message skipped for them).
    pub dropped: usize,
    /// Observers removed during this fan-out.
    pub evicted: Vec<ConnectionId>,
}

/// Fan-out set for observer connections.
pub struct BroadcastHub {
    observers: HashMap<ConnectionId, ObserverChannel>,
    queue_capacity: usize,
    max_drops: u64,
}

impl BroadcastHub {
    /// Creates an empty hub.
    ///
    /// `queue_capacity` is clamped to at least 2 (the baseline size);
    /// `max_drops` to at least 1.
    pub fn new(queue_capacity: usize, max_drops: u64) -> Self {
        Self {
            observers: HashMap::new(),
            queue_capacity: queue_capacity.max(2),
            max_drops: max_drops.max(1),
        }
    }

    /// Attaches an observer and queues `baseline` ahead of any live message.
    ///
    /// Re-attaching an id replaces its previous queue (the old stream ends).
    pub fn attach(&mut self, id: ConnectionId, baseline: Vec<ObserverMessage>) -> ObserverStream {
        let (sender, rx) = mpsc::channel(self.queue_capacity.max(baseline.len()));
        for msg in baseline {
            // Fresh channel sized for the baseline: cannot be full or closed.
            let _ = sender.try_send(Arc::new(msg));
        }
        self.observers
            .insert(id.clone(), ObserverChannel { sender, drops: 0 });
        ObserverStream::new(id, rx)
    }

    /// Detaches an observer. Returns `false` if it was not attached.
    pub fn detach(&mut self, id: &ConnectionId) -> bool {
        self.observers.remove(id).is_some()
    }

    #[inline]
    pub fn is_attached(&self, id: &ConnectionId) -> bool {
        self.observers.contains_key(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn publish_detection(&mut self, record: &DetectionRecord) -> Delivery {
        self.publish(ObserverMessage::Detection(record.clone()))
    }

    pub fn publish_status(&mut self, status: &StatusEvent) -> Delivery {
        self.publish(ObserverMessage::DetectorStatus(status.clone()))
    }

    /// Queues `msg` for every attached observer.
    pub fn publish(&mut self, msg: ObserverMessage) -> Delivery {
        let msg = Arc::new(msg);
        let mut delivery = Delivery::default();

        for (id, channel) in &mut self.observers {
            if Self::offer(channel, &msg, self.max_drops, &mut delivery) {
                delivery.evicted.push(id.clone());
            }
        }
        for id in &delivery.evicted {
            self.observers.remove(id);
        }
        delivery
    }

    /// Queues `msgs` (in order) for a single observer.
    pub fn send_to(&mut self, id: &ConnectionId, msgs: Vec<ObserverMessage>) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(channel) = self.observers.get_mut(id) else {
            return delivery;
        };

        for msg in msgs {
            if Self::offer(channel, &Arc::new(msg), self.max_drops, &mut delivery) {
                delivery.evicted.push(id.clone());
                break;
            }
        }
        if !delivery.evicted.is_empty() {
            self.observers.remove(id);
        }
        delivery
    }

    /// Drops every queue; all streams end.
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Tries to queue one message. Returns `true` when the observer must be evicted.
    fn offer(
        channel: &mut ObserverChannel,
        msg: &Arc<ObserverMessage>,
        max_drops: u64,
        delivery: &mut Delivery,
    ) -> bool {
        match channel.sender.try_send(Arc::clone(msg)) {
            Ok(()) => {
                delivery.delivered += 1;
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                delivery.dropped += 1;
                channel.drops += 1;
                channel.drops >= max_drops
            }
            Err(mpsc::error::TrySendError::Closed(_)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use chrono::Utc;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    fn baseline() -> Vec<ObserverMessage> {
        vec![
            ObserverMessage::SessionStats(None),
            ObserverMessage::DetectorStatus(StatusEvent::now(false)),
        ]
    }

    fn record(total: u64) -> DetectionRecord {
        DetectionRecord {
            baik: 1,
            cacat: 0,
            total_baik: total,
            total_cacat: 0,
            session_id: SessionId::new(),
            sequence: total,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_attach_queues_baseline_first() {
        let mut hub = BroadcastHub::new(8, 10);
        let mut stream = hub.attach(id("o1"), baseline());
        hub.publish_detection(&record(1));

        let got = stream.drain();
        assert_eq!(got.len(), 3);
        assert!(got[0].is_baseline());
        assert_eq!(got[1].name(), "detector_status");
        assert_eq!(got[2].name(), "detection");
    }

    #[test]
    fn test_publish_reaches_all_observers_in_order() {
        let mut hub = BroadcastHub::new(16, 10);
        let mut a = hub.attach(id("a"), vec![]);
        let mut b = hub.attach(id("b"), vec![]);

        for n in 1..=3 {
            let d = hub.publish_detection(&record(n));
            assert_eq!(d.delivered, 2);
        }
        hub.publish_status(&StatusEvent::now(false));

        for stream in [&mut a, &mut b] {
            let names: Vec<_> = stream.drain().iter().map(|m| m.name()).collect();
            assert_eq!(
                names,
                ["detection", "detection", "detection", "detector_status"]
            );
        }
    }

    #[test]
    fn test_publish_shares_one_allocation() {
        let mut hub = BroadcastHub::new(4, 10);
        let mut a = hub.attach(id("a"), vec![]);
        let mut b = hub.attach(id("b"), vec![]);
        hub.publish_detection(&record(1));

        let ma = a.try_recv().unwrap();
        let mb = b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&ma, &mb));
    }

    #[test]
    fn test_slow_observer_is_isolated_then_evicted() {
        let mut hub = BroadcastHub::new(2, 3);
        let _slow = hub.attach(id("slow"), vec![]);
        let mut fast = hub.attach(id("fast"), vec![]);

        // fills the slow queue
        hub.publish_detection(&record(1));
        hub.publish_detection(&record(2));
        fast.drain();

        let mut evicted = Vec::new();
        for n in 3..6 {
            let d = hub.publish_detection(&record(n));
            evicted.extend(d.evicted);
            assert_eq!(fast.drain().len(), 1);
        }

        assert_eq!(evicted, vec![id("slow")]);
        assert!(!hub.is_attached(&id("slow")));
        assert_eq!(hub.observer_count(), 1);
    }

    #[test]
    fn test_closed_receiver_is_evicted_immediately() {
        let mut hub = BroadcastHub::new(4, 100);
        let gone = hub.attach(id("gone"), vec![]);
        drop(gone);

        let d = hub.publish_status(&StatusEvent::now(true));
        assert_eq!(d.evicted, vec![id("gone")]);
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn test_reattach_replaces_old_stream() {
        let mut hub = BroadcastHub::new(4, 10);
        let mut old = hub.attach(id("o"), vec![]);
        let mut new = hub.attach(id("o"), baseline());
        hub.publish_detection(&record(1));

        assert!(old.try_recv().is_none());
        assert_eq!(new.drain().len(), 3);
        assert_eq!(hub.observer_count(), 1);
    }

    #[test]
    fn test_send_to_targets_one_observer() {
        let mut hub = BroadcastHub::new(4, 10);
        let mut a = hub.attach(id("a"), vec![]);
        let mut b = hub.attach(id("b"), vec![]);

        let d = hub.send_to(&id("a"), baseline());
        assert_eq!(d.delivered, 2);
        assert_eq!(a.drain().len(), 2);
        assert!(b.try_recv().is_none());

        let missing = hub.send_to(&id("nobody"), baseline());
        assert_eq!(missing, Delivery::default());
    }

    #[test]
    fn test_detach_ends_stream() {
        let mut hub = BroadcastHub::new(4, 10);
        let mut s = hub.attach(id("a"), vec![]);
        assert!(hub.detach(&id("a")));
        assert!(!hub.detach(&id("a")));
        assert!(s.try_recv().is_none());
    }
}
