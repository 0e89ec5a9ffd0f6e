use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{LiveSession, SessionId};

/// Immutable result of one accepted detection.
///
/// `baik`/`cacat` are this event's delta; the totals are the running totals
/// right after it was applied. `sequence` is 1-based within the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub baik: u64,
    pub cacat: u64,
    pub total_baik: u64,
    pub total_cacat: u64,
    pub session_id: SessionId,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl DetectionRecord {
    pub(crate) fn from_snapshot(baik: u64, cacat: u64, session: &LiveSession) -> Self {
        Self {
            baik,
            cacat,
            total_baik: session.total_baik,
            total_cacat: session.total_cacat,
            session_id: session.session_id,
            sequence: session.detection_count,
            timestamp: Utc::now(),
        }
    }
}
