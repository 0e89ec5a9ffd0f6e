//! # LiveSession store.
//!
//! Holds the single current session and its running totals.
//!
//! ## Rules
//! - At most one `Active` session exists at a time.
//! - Only the aggregator calls [`SessionStore::apply_delta`]; only the lifecycle
//!   controller calls [`SessionStore::create`] / [`SessionStore::stop`].
//! - Mutations are visible to others only through returned snapshots (no `&mut` escapes).
//! - A stopped session stays readable until the next `create` replaces it.

use chrono::Utc;

use super::types::{LiveSession, SessionStatus};
use crate::error::HubError;

/// Owner of the current [`LiveSession`].
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<LiveSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Creates a fresh active session (new id, zero totals) and returns its snapshot.
    ///
    /// If a session is already active it is left untouched and returned instead,
    /// so the store can never hold two active sessions or silently reset totals.
    pub(crate) fn create(&mut self) -> LiveSession {
        if let Some(active) = self.active() {
            return active.clone();
        }
        let session = LiveSession::begin();
        self.current = Some(session.clone());
        session
    }

    /// Returns a snapshot of the current session (active or last stopped), if any.
    pub fn current(&self) -> Option<LiveSession> {
        self.current.clone()
    }

    /// Returns the active session, if any.
    pub fn active(&self) -> Option<&LiveSession> {
        self.current.as_ref().filter(|s| s.is_active())
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Adds the deltas to the active session and returns the updated snapshot.
    ///
    /// Fails with [`HubError::NoActiveSession`] (no side effect) when nothing is active.
    pub(crate) fn apply_delta(&mut self, baik: u64, cacat: u64) -> Result<LiveSession, HubError> {
        let session = self
            .current
            .as_mut()
            .filter(|s| s.is_active())
            .ok_or(HubError::NoActiveSession)?;

        session.total_baik = session.total_baik.saturating_add(baik);
        session.total_cacat = session.total_cacat.saturating_add(cacat);
        session.detection_count += 1;
        Ok(session.clone())
    }

    /// Marks the active session stopped and returns its final snapshot.
    ///
    /// Fails with [`HubError::NoActiveSession`] when nothing is active.
    pub(crate) fn stop(&mut self) -> Result<LiveSession, HubError> {
        let session = self
            .current
            .as_mut()
            .filter(|s| s.is_active())
            .ok_or(HubError::NoActiveSession)?;

        session.status = SessionStatus::Stopped;
        session.stopped_at = Some(Utc::now());
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_active_with_zero_totals() {
        let mut store = SessionStore::new();
        assert!(store.current().is_none());

        let s = store.create();
        assert!(s.is_active());
        assert_eq!((s.total_baik, s.total_cacat, s.detection_count), (0, 0, 0));
        assert_eq!(store.current(), Some(s));
    }

    #[test]
    fn test_create_while_active_keeps_existing_session() {
        let mut store = SessionStore::new();
        let first = store.create();
        store.apply_delta(2, 1).unwrap();

        let again = store.create();
        assert_eq!(again.session_id, first.session_id);
        assert_eq!((again.total_baik, again.total_cacat), (2, 1));
    }

    #[test]
    fn test_apply_delta_accumulates() {
        let mut store = SessionStore::new();
        store.create();
        store.apply_delta(3, 1).unwrap();
        let s = store.apply_delta(0, 2).unwrap();

        assert_eq!((s.total_baik, s.total_cacat), (3, 3));
        assert_eq!(s.detection_count, 2);
    }

    #[test]
    fn test_apply_delta_without_session_fails() {
        let mut store = SessionStore::new();
        assert_eq!(store.apply_delta(1, 0), Err(HubError::NoActiveSession));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_stopped_session_is_frozen() {
        let mut store = SessionStore::new();
        store.create();
        store.apply_delta(5, 0).unwrap();

        let stopped = store.stop().unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert!(stopped.stopped_at.is_some());

        assert_eq!(store.apply_delta(1, 1), Err(HubError::NoActiveSession));
        assert_eq!(store.stop(), Err(HubError::NoActiveSession));
        assert_eq!(store.current(), Some(stopped));
    }

    #[test]
    fn test_create_after_stop_gets_new_identity() {
        let mut store = SessionStore::new();
        let first = store.create();
        store.apply_delta(4, 4).unwrap();
        store.stop().unwrap();

        let second = store.create();
        assert_ne!(second.session_id, first.session_id);
        assert_eq!((second.total_baik, second.total_cacat), (0, 0));
    }
}
