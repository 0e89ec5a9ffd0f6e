use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier (UUIDv7, time-ordered).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Stopped,
}

/// Snapshot of the live aggregation session.
///
/// Values of this type are copies; the authoritative instance lives inside
/// [`SessionStore`](super::SessionStore) and is only mutated by the hub actor.
///
/// ### Invariants
/// - `session_id` and `started_at` never change.
/// - Totals and `detection_count` never decrease while `Active`.
/// - A `Stopped` session is never mutated again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub total_baik: u64,
    pub total_cacat: u64,
    /// Number of detections accepted so far.
    pub detection_count: u64,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    pub(crate) fn begin() -> Self {
        Self {
            session_id: SessionId::new(),
            started_at: Utc::now(),
            total_baik: 0,
            total_cacat: 0,
            detection_count: 0,
            status: SessionStatus::Active,
            stopped_at: None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Active)
    }

    /// Sum of both totals.
    #[inline]
    pub fn total_inspected(&self) -> u64 {
        self.total_baik.saturating_add(self.total_cacat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_wire_field_names() {
        let session = LiveSession::begin();
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["sessionId"], session.session_id.to_string());
        assert_eq!(json["totalBaik"], 0);
        assert_eq!(json["totalCacat"], 0);
        assert_eq!(json["status"], "active");
        assert!(json.get("startedAt").is_some());
        assert!(json.get("stoppedAt").is_none());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_total_inspected_saturates() {
        let mut session = LiveSession::begin();
        session.total_baik = 7;
        session.total_cacat = 2;
        assert_eq!(session.total_inspected(), 9);

        session.total_baik = u64::MAX;
        assert_eq!(session.total_inspected(), u64::MAX);
    }
}
