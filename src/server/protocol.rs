//! WebSocket wire protocol.
//!
//! Every frame is a JSON text frame `{"event": <name>, "data": <payload>}`.
//!
//! | inbound event | data                                   | reply                         |
//! |---------------|----------------------------------------|-------------------------------|
//! | `register`    | `{"role": "detector" \| "dashboard"}`  | `registered` or `error`       |
//! | `detection`   | `{"baik": n, "cacat": n}`              | nothing, or `error`           |
//! | `get_live`    | ignored                                | baseline on the observer feed |
//! | `ping`        | ignored                                | `pong`                        |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    connections::ConnectionRole, detection::DetectionEvent, error::HubError, session::LiveSession,
};

/// Role names used on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    Detector,
    Dashboard,
}

impl From<WireRole> for ConnectionRole {
    fn from(role: WireRole) -> Self {
        match role {
            WireRole::Detector => ConnectionRole::Producer,
            WireRole::Dashboard => ConnectionRole::Observer,
        }
    }
}

/// Parsed inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    Register(WireRole),
    Detection(DetectionEvent),
    GetLive,
    Ping,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RegisterData {
    role: WireRole,
}

/// Why an inbound frame could not be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not a `{event, data}` JSON object.
    Malformed(String),
    /// Unknown `event` name.
    UnknownEvent(String),
    /// Known event with unusable data.
    Invalid(HubError),
}

impl ProtocolError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed_frame",
            ProtocolError::UnknownEvent(_) => "unknown_event",
            ProtocolError::Invalid(err) => err.as_label(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ProtocolError::Malformed(why) => format!("malformed frame: {why}"),
            ProtocolError::UnknownEvent(name) => format!("unknown event: {name}"),
            ProtocolError::Invalid(err) => err.to_string(),
        }
    }
}

impl ClientMessage {
    /// Parses one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let env: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        match env.event.as_str() {
            "register" => serde_json::from_value::<RegisterData>(env.data)
                .map(|d| ClientMessage::Register(d.role))
                .map_err(|e| ProtocolError::Malformed(e.to_string())),
            "detection" => DetectionEvent::from_json(&env.data)
                .map(ClientMessage::Detection)
                .map_err(ProtocolError::Invalid),
            "get_live" => Ok(ClientMessage::GetLive),
            "ping" => Ok(ClientMessage::Ping),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// Outbound frame answering a client request.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerReply {
    Registered {
        role: WireRole,
    },
    Error {
        error: &'static str,
        message: String,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    /// `get_live` answer for connections without an observer feed.
    SessionStats(Option<LiveSession>),
}

impl ServerReply {
    pub fn error(err: &HubError) -> Self {
        ServerReply::Error {
            error: err.as_label(),
            message: err.to_string(),
        }
    }

    pub fn pong() -> Self {
        ServerReply::Pong {
            timestamp: Utc::now(),
        }
    }
}

impl From<&ProtocolError> for ServerReply {
    fn from(err: &ProtocolError) -> Self {
        ServerReply::Error {
            error: err.as_label(),
            message: err.message(),
        }
    }
}
