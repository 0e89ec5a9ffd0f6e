//! # Runtime events emitted by the hub.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Session events**: lifecycle transitions and accepted/rejected detections
//! - **Connection events**: registrations, rejections, producer loss, evictions
//! - **Persistence events**: backend failures and queue overflow
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries the metadata relevant to each kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events published by the hub actor are also published in the order it applied them.
//!
//! ## Example
//! ```rust
//! use qcvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProducerRejected)
//!     .with_connection("raspi-2")
//!     .with_reason("already_registered");
//!
//! assert_eq!(ev.kind, EventKind::ProducerRejected);
//! assert_eq!(ev.connection.as_deref(), Some("raspi-2"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::session::{LiveSession, SessionId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session events ===
    /// A new session became active.
    ///
    /// Sets: `session`, `totals` (zero).
    SessionStarted,

    /// The active session stopped (explicit stop or producer loss).
    ///
    /// Sets: `session`, `totals` (final), `reason` (`"command"` or `"producer_lost"`).
    SessionStopped,

    /// A detection was folded into the session.
    ///
    /// Sets: `session`, `connection` (if submitted over a connection), `totals`.
    DetectionRecorded,

    /// A detection was rejected (`NoActiveSession` or `InvalidDetection`).
    ///
    /// Sets: `connection` (if any), `reason` (error label).
    DetectionRejected,

    /// A detection arrived from a connection that is not the producer.
    ///
    /// Sets: `connection`.
    UnauthorizedDetection,

    // === Connection events ===
    /// Transport reported a new connection.
    ConnectionOpened,

    /// Transport reported a disconnect.
    ///
    /// Sets: `connection`, `reason` (role it held).
    ConnectionClosed,

    /// A connection claimed the producer slot.
    ProducerRegistered,

    /// A producer registration was refused.
    ///
    /// Sets: `connection`, `reason` (error label).
    ProducerRejected,

    /// The producer disconnected.
    ///
    /// Sets: `connection`, `session` (if one was active).
    ProducerLost,

    /// An observer attached and received its baseline.
    ObserverRegistered,

    /// An observer was dropped for being too slow or gone.
    ///
    /// Sets: `connection`.
    ObserverEvicted,

    // === Persistence events ===
    /// The persistence backend returned an error or panicked.
    ///
    /// Sets: `reason`, `session` (if known).
    PersistenceFailed,

    /// The persistence queue was full; the operation was dropped.
    ///
    /// Sets: `reason` (operation name).
    PersistenceOverflow,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (`subscriber=<name> info=<panic>`).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (`subscriber=<name> reason=<full|closed>`).
    SubscriberOverflow,
}

impl EventKind {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SessionStarted => "session_started",
            EventKind::SessionStopped => "session_stopped",
            EventKind::DetectionRecorded => "detection_recorded",
            EventKind::DetectionRejected => "detection_rejected",
            EventKind::UnauthorizedDetection => "unauthorized_detection",
            EventKind::ConnectionOpened => "connection_opened",
            EventKind::ConnectionClosed => "connection_closed",
            EventKind::ProducerRegistered => "producer_registered",
            EventKind::ProducerRejected => "producer_rejected",
            EventKind::ProducerLost => "producer_lost",
            EventKind::ObserverRegistered => "observer_registered",
            EventKind::ObserverEvicted => "observer_evicted",
            EventKind::PersistenceFailed => "persistence_failed",
            EventKind::PersistenceOverflow => "persistence_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Session involved, if any.
    pub session: Option<SessionId>,
    /// Connection involved, if any.
    pub connection: Option<Arc<str>>,
    /// Human-readable reason (error labels, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// `(total_baik, total_cacat)` after the event, if applicable.
    pub totals: Option<(u64, u64)>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            session: None,
            connection: None,
            reason: None,
            totals: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a connection id.
    #[inline]
    pub fn with_connection(mut self, connection: impl Into<Arc<str>>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    /// Attaches the session id and its current totals.
    #[inline]
    pub fn with_session(mut self, session: &LiveSession) -> Self {
        self.session = Some(session.session_id);
        self.totals = Some((session.total_baik, session.total_cacat));
        self
    }

    /// Attaches a session id only.
    #[inline]
    pub fn with_session_id(mut self, id: SessionId) -> Self {
        self.session = Some(id);
        self
    }

    /// Attaches running totals.
    #[inline]
    pub fn with_totals(mut self, baik: u64, cacat: u64) -> Self {
        self.totals = Some((baik, cacat));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
