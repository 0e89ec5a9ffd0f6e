use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{detection::DetectionRecord, session::LiveSession};

/// Producer presence change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub connected: bool,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn now(connected: bool) -> Self {
        Self {
            connected,
            timestamp: Utc::now(),
        }
    }
}

/// Message delivered to observers.
///
/// Wire form: `{"event": "<snake_case name>", "data": <payload>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ObserverMessage {
    /// Baseline: current session (or `null` before the first start).
    SessionStats(Option<LiveSession>),
    /// Producer presence.
    DetectorStatus(StatusEvent),
    /// One accepted detection.
    Detection(DetectionRecord),
}

impl ObserverMessage {
    /// Wire name of the message.
    pub fn name(&self) -> &'static str {
        match self {
            ObserverMessage::SessionStats(_) => "session_stats",
            ObserverMessage::DetectorStatus(_) => "detector_status",
            ObserverMessage::Detection(_) => "detection",
        }
    }

    #[inline]
    pub fn is_baseline(&self) -> bool {
        matches!(self, ObserverMessage::SessionStats(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_uses_event_and_data() {
        let msg = ObserverMessage::DetectorStatus(StatusEvent::now(true));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "detector_status");
        assert_eq!(json["data"]["connected"], true);
        assert!(json["data"]["timestamp"].is_string());
        assert_eq!(msg.name(), "detector_status");
    }

    #[test]
    fn test_empty_baseline_serializes_null() {
        let json = serde_json::to_value(ObserverMessage::SessionStats(None)).unwrap();
        assert_eq!(json["event"], "session_stats");
        assert!(json["data"].is_null());
    }
}
