//! # Session lifecycle and connection coordination.
//!
//! Every operation the hub accepts, applied to [`HubState`] by the actor.
//!
//! ## State machine
//! ```text
//!             start (publishes connected=true)
//!   NoSession ───────────────────────────────► Active ──┐
//!       ▲  │                                    │  ▲    │ start: idempotent,
//!       │  └─ stop: no-op                       │  └────┘ returns the live session
//!       │                                       │
//!       └───────────────────────────────────────┘
//!          stop | producer lost (publishes connected=false)
//! ```
//!
//! ## Presence
//! `detector_status` goes out on every session transition (above) and on every
//! producer change: `connected=true` when a producer is granted the slot,
//! `connected=false` when it leaves. A change that coincides with a transition
//! is announced once. Baselines and [`HubStatus`] report whether a producer
//! holds the slot right now.
//!
//! ## Rules
//! - Every transition commits in memory first; persistence, observer fan-out and
//!   runtime events follow and never fail the operation.
//! - Producer loss while `Active` forces exactly one stop.
//! - Rejected operations change nothing.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::state::HubState;
use crate::{
    broadcast::ObserverStream,
    connections::{Admission, ConnectionId, ConnectionRole},
    detection::{DetectionEvent, DetectionRecord},
    error::HubError,
    events::{Event, EventKind},
    persistence::PersistOp,
    session::LiveSession,
};

/// Outcome of a start request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStart {
    /// The active session after the call.
    pub session: LiveSession,
    /// `false` when a session was already active and was returned unchanged.
    pub created: bool,
}

/// Outcome of a disconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Departure {
    /// Role the connection held.
    pub role: ConnectionRole,
    /// The connection was the producer.
    pub was_producer: bool,
    /// Session stopped because the producer left.
    pub stopped: Option<LiveSession>,
}

/// Read-only view of the hub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    /// Current (or last stopped) session.
    pub session: Option<LiveSession>,
    /// A producer holds the slot.
    pub detector_connected: bool,
    pub producer: Option<ConnectionId>,
    pub observers: usize,
    pub connections: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StopReason {
    Command,
    ProducerLost,
}

impl StopReason {
    fn as_label(&self) -> &'static str {
        match self {
            StopReason::Command => "command",
            StopReason::ProducerLost => "producer_lost",
        }
    }
}

impl HubState {
    /// `NoSession → Active`, or returns the active session untouched.
    pub(crate) fn start_session(&mut self) -> SessionStart {
        if let Some(active) = self.store.active() {
            return SessionStart {
                session: active.clone(),
                created: false,
            };
        }

        let session = self.store.create();
        info!(session = %session.session_id, "session started");

        self.persist(PersistOp::SessionStarted(session.clone()));
        self.bus
            .publish(Event::new(EventKind::SessionStarted).with_session(&session));
        self.publish_status(true);

        SessionStart {
            session,
            created: true,
        }
    }

    /// `Active → NoSession`. Returns `None` (and does nothing) without an active session.
    pub(crate) fn stop_session(&mut self, reason: StopReason) -> Option<LiveSession> {
        let session = self.store.stop().ok()?;
        info!(
            session = %session.session_id,
            total_baik = session.total_baik,
            total_cacat = session.total_cacat,
            total_inspected = session.total_inspected(),
            reason = reason.as_label(),
            "session stopped"
        );

        self.persist(PersistOp::SessionStopped(session.clone()));
        self.bus.publish(
            Event::new(EventKind::SessionStopped)
                .with_session(&session)
                .with_reason(reason.as_label()),
        );
        self.publish_status(false);

        Some(session)
    }

    /// Folds one delta into the active session and fans the record out.
    ///
    /// With `from = Some(id)` the delta is accepted only from the producer.
    pub(crate) fn submit_detection(
        &mut self,
        from: Option<&ConnectionId>,
        event: &DetectionEvent,
    ) -> Result<DetectionRecord, HubError> {
        if let Some(id) = from {
            if !self.registrar.is_producer(id) {
                warn!(connection = %id, "detection from non-producer ignored");
                self.bus
                    .publish(Event::new(EventKind::UnauthorizedDetection).with_connection(id));
                return Err(HubError::Unauthorized {
                    connection: id.clone(),
                });
            }
        }

        let record = match self.aggregator.record(&mut self.store, event) {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "detection rejected");
                let mut ev = Event::new(EventKind::DetectionRejected).with_reason(err.as_label());
                if let Some(id) = from {
                    ev = ev.with_connection(id);
                }
                self.bus.publish(ev);
                return Err(err);
            }
        };
        debug!(
            session = %record.session_id,
            sequence = record.sequence,
            baik = record.baik,
            cacat = record.cacat,
            total_baik = record.total_baik,
            total_cacat = record.total_cacat,
            "detection recorded"
        );

        self.persist(PersistOp::Detection(record.clone()));
        let delivery = self.broadcast.publish_detection(&record);
        self.handle_evictions(delivery);

        let mut ev = Event::new(EventKind::DetectionRecorded)
            .with_session_id(record.session_id)
            .with_totals(record.total_baik, record.total_cacat);
        if let Some(id) = from {
            ev = ev.with_connection(id);
        }
        self.bus.publish(ev);

        Ok(record)
    }

    /// Tracks a freshly opened connection. Returns `false` if it was already known.
    pub(crate) fn connect(&mut self, id: ConnectionId) -> bool {
        let fresh = self.registrar.connect(id.clone());
        if fresh {
            debug!(connection = %id, "connection opened");
            self.bus
                .publish(Event::new(EventKind::ConnectionOpened).with_connection(&id));
        }
        fresh
    }

    /// Claims the producer slot and makes sure a session is running.
    pub(crate) fn register_producer(&mut self, id: &ConnectionId) -> Result<SessionStart, HubError> {
        let admission = match self.registrar.register_producer(id) {
            Ok(admission) => admission,
            Err(err) => {
                warn!(connection = %id, error = %err, "producer registration rejected");
                self.bus.publish(
                    Event::new(EventKind::ProducerRejected)
                        .with_connection(id)
                        .with_reason(err.as_label()),
                );
                return Err(err);
            }
        };

        let granted = admission == Admission::Granted;
        if granted {
            info!(connection = %id, "producer registered");
            self.bus
                .publish(Event::new(EventKind::ProducerRegistered).with_connection(id));
        }

        let start = self.start_session();
        if granted && !start.created {
            self.publish_status(true);
        }
        Ok(start)
    }

    /// Grants the observer role and attaches a stream primed with the baseline.
    pub(crate) fn register_observer(&mut self, id: &ConnectionId) -> Result<ObserverStream, HubError> {
        if let Err(err) = self.registrar.register_observer(id) {
            warn!(connection = %id, error = %err, "observer registration rejected");
            return Err(err);
        }

        let baseline = self.baseline();
        let stream = self.broadcast.attach(id.clone(), baseline);
        debug!(connection = %id, observers = self.broadcast.observer_count(), "observer registered");
        self.bus
            .publish(Event::new(EventKind::ObserverRegistered).with_connection(id));

        Ok(stream)
    }

    /// Re-queues the baseline for an attached observer. `false` if `id` is not one.
    pub(crate) fn resync(&mut self, id: &ConnectionId) -> bool {
        if !self.broadcast.is_attached(id) {
            return false;
        }
        let baseline = self.baseline();
        let delivery = self.broadcast.send_to(id, baseline);
        let queued = delivery.evicted.is_empty() && delivery.dropped == 0;
        self.handle_evictions(delivery);
        queued
    }

    /// Forgets a connection; producer loss stops the active session.
    pub(crate) fn disconnect(&mut self, id: &ConnectionId) -> Departure {
        let gone = self.registrar.unregister(id);
        self.broadcast.detach(id);
        debug!(connection = %id, role = %gone.role, "connection closed");
        self.bus.publish(
            Event::new(EventKind::ConnectionClosed)
                .with_connection(id)
                .with_reason(gone.role.as_str()),
        );

        let mut stopped = None;
        if gone.was_producer {
            warn!(connection = %id, "producer lost");
            let mut ev = Event::new(EventKind::ProducerLost).with_connection(id);
            if let Some(active) = self.store.active() {
                ev = ev.with_session_id(active.session_id);
            }
            self.bus.publish(ev);

            stopped = self.stop_session(StopReason::ProducerLost);
            if stopped.is_none() {
                self.publish_status(false);
            }
        }

        Departure {
            role: gone.role,
            was_producer: gone.was_producer,
            stopped,
        }
    }

    pub(crate) fn current(&self) -> Option<LiveSession> {
        self.store.current()
    }

    pub(crate) fn is_producer(&self, id: &ConnectionId) -> bool {
        self.registrar.is_producer(id)
    }

    pub(crate) fn status(&self) -> HubStatus {
        HubStatus {
            session: self.store.current(),
            detector_connected: self.producer_connected(),
            producer: self.registrar.producer().cloned(),
            observers: self.broadcast.observer_count(),
            connections: self.registrar.connection_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        broadcast::{ObserverMessage, StatusEvent},
        core::Config,
        events::Bus,
        session::SessionStatus,
    };
    use assert_matches::assert_matches;

    fn state() -> HubState {
        HubState::new(&Config::default(), Bus::new(64), None)
    }

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    fn statuses(stream: &mut ObserverStream) -> Vec<bool> {
        stream
            .drain()
            .iter()
            .filter_map(|m| match m.as_ref() {
                ObserverMessage::DetectorStatus(StatusEvent { connected, .. }) => Some(*connected),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_is_idempotent_while_active() {
        let mut st = state();
        let first = st.start_session();
        st.submit_detection(None, &DetectionEvent::new(2, 1)).unwrap();
        let second = st.start_session();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.session.session_id, first.session.session_id);
        assert_eq!(second.session.total_baik, 2);
        assert_eq!(second.session.total_cacat, 1);
    }

    #[test]
    fn test_stop_without_session_is_noop() {
        let mut st = state();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        assert_eq!(st.stop_session(StopReason::Command), None);
        assert!(obs.try_recv().is_none());
    }

    #[test]
    fn test_restart_creates_fresh_session() {
        let mut st = state();
        let first = st.start_session().session;
        st.submit_detection(None, &DetectionEvent::new(5, 0)).unwrap();
        let stopped = st.stop_session(StopReason::Command).unwrap();
        let second = st.start_session().session;

        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert_eq!(stopped.total_baik, 5);
        assert_ne!(second.session_id, first.session_id);
        assert_eq!(second.total_baik, 0);
    }

    #[test]
    fn test_transitions_publish_presence() {
        let mut st = state();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        st.start_session();
        st.start_session();
        st.stop_session(StopReason::Command);
        assert_eq!(statuses(&mut obs), vec![true, false]);
        assert!(!st.status().detector_connected);
    }

    #[test]
    fn test_detection_from_non_producer_changes_nothing() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let err = st
            .submit_detection(Some(&id("dash")), &DetectionEvent::new(4, 4))
            .unwrap_err();
        assert_matches!(err, HubError::Unauthorized { connection } if connection == id("dash"));

        let session = st.current().unwrap();
        assert_eq!((session.total_baik, session.total_cacat), (0, 0));
        assert!(obs.try_recv().is_none());
    }

    #[test]
    fn test_producer_detection_reaches_observers() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let record = st
            .submit_detection(Some(&id("raspi")), &DetectionEvent::new(1, 2))
            .unwrap();
        assert_eq!(record.sequence, 1);
        assert_matches!(obs.try_recv().as_deref(), Some(ObserverMessage::Detection(r)) if *r == record);
    }

    #[test]
    fn test_producer_registration_starts_session_and_announces_presence() {
        let mut st = state();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let start = st.register_producer(&id("raspi")).unwrap();
        assert!(start.created);
        assert!(st.is_producer(&id("raspi")));
        assert_eq!(statuses(&mut obs), vec![true]);

        // Incumbent again: same session, no new status.
        let again = st.register_producer(&id("raspi")).unwrap();
        assert!(!again.created);
        assert_eq!(again.session.session_id, start.session.session_id);
        assert!(obs.try_recv().is_none());
    }

    #[test]
    fn test_producer_joining_running_session_announces_presence() {
        let mut st = state();
        let session = st.start_session().session;
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let start = st.register_producer(&id("raspi")).unwrap();
        assert!(!start.created);
        assert_eq!(start.session.session_id, session.session_id);
        assert_eq!(statuses(&mut obs), vec![true]);
        assert!(st.status().detector_connected);
    }

    #[test]
    fn test_baseline_reports_producer_not_session() {
        let mut st = state();

        // Session started without a producer.
        st.start_session();
        let mut obs = st.register_observer(&id("dash-a")).unwrap();
        assert_eq!(statuses(&mut obs), vec![false]);
        assert!(!st.status().detector_connected);

        // Producer still registered after a manual stop.
        st.register_producer(&id("raspi")).unwrap();
        st.stop_session(StopReason::Command);
        let mut late = st.register_observer(&id("dash-b")).unwrap();
        assert_eq!(statuses(&mut late), vec![true]);
        assert!(st.status().detector_connected);
        assert!(st.is_producer(&id("raspi")));
    }

    #[test]
    fn test_second_producer_is_rejected() {
        let mut st = state();
        st.register_producer(&id("raspi-1")).unwrap();

        let err = st.register_producer(&id("raspi-2")).unwrap_err();
        assert_matches!(err, HubError::AlreadyRegistered { incumbent } if incumbent == id("raspi-1"));
        assert_eq!(st.status().producer, Some(id("raspi-1")));
    }

    #[test]
    fn test_producer_loss_stops_session_once() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        st.submit_detection(Some(&id("raspi")), &DetectionEvent::new(3, 0))
            .unwrap();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let departure = st.disconnect(&id("raspi"));
        assert!(departure.was_producer);
        assert_eq!(departure.role, ConnectionRole::Producer);
        let stopped = departure.stopped.unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert_eq!(stopped.total_baik, 3);
        assert_eq!(statuses(&mut obs), vec![false]);

        let again = st.disconnect(&id("raspi"));
        assert!(!again.was_producer);
        assert!(obs.try_recv().is_none());
    }

    #[test]
    fn test_producer_loss_after_manual_stop_still_announced() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        st.stop_session(StopReason::Command);
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        let departure = st.disconnect(&id("raspi"));
        assert!(departure.was_producer);
        assert!(departure.stopped.is_none());
        assert_eq!(statuses(&mut obs), vec![false]);
        assert!(!st.status().detector_connected);
    }

    #[test]
    fn test_observer_departure_publishes_no_presence() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        st.register_observer(&id("dash-a")).unwrap();
        let mut obs = st.register_observer(&id("dash-b")).unwrap();
        obs.drain();

        let departure = st.disconnect(&id("dash-a"));
        assert!(!departure.was_producer);
        assert!(obs.try_recv().is_none());
    }

    #[test]
    fn test_observer_baseline_reflects_state() {
        let mut st = state();
        st.register_producer(&id("raspi")).unwrap();
        st.submit_detection(None, &DetectionEvent::new(2, 2)).unwrap();

        let mut obs = st.register_observer(&id("dash")).unwrap();
        let msgs = obs.drain();
        assert_eq!(msgs.len(), 2);
        assert_matches!(msgs[0].as_ref(), ObserverMessage::SessionStats(Some(s)) if s.total_baik == 2);
        assert_matches!(
            msgs[1].as_ref(),
            ObserverMessage::DetectorStatus(StatusEvent { connected: true, .. })
        );
    }

    #[test]
    fn test_resync_only_for_observers() {
        let mut st = state();
        let mut obs = st.register_observer(&id("dash")).unwrap();
        obs.drain();

        assert!(st.resync(&id("dash")));
        assert_eq!(obs.drain().len(), 2);
        assert!(!st.resync(&id("raspi")));
    }

    #[test]
    fn test_role_conflict_is_rejected() {
        let mut st = state();
        st.register_observer(&id("dash")).unwrap();

        let err = st.register_producer(&id("dash")).unwrap_err();
        assert_matches!(err, HubError::RoleConflict { current: ConnectionRole::Observer, .. });
        assert!(st.current().is_none());
    }

    #[test]
    fn test_evicted_observer_is_unregistered() {
        let mut st = state();
        st.start_session();
        let obs = st.register_observer(&id("dash")).unwrap();
        drop(obs);

        st.submit_detection(None, &DetectionEvent::new(1, 0)).unwrap();
        let status = st.status();
        assert_eq!(status.observers, 0);
        assert_eq!(status.connections, 0);
    }

    #[test]
    fn test_connect_counts_unregistered_connections() {
        let mut st = state();
        assert!(st.connect(id("a")));
        assert!(!st.connect(id("a")));
        assert_eq!(st.status().connections, 1);

        let departure = st.disconnect(&id("a"));
        assert_eq!(departure.role, ConnectionRole::Unregistered);
        assert_eq!(st.status().connections, 0);
    }
}
