use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a live connection plays.
///
/// Exactly one connection may be [`ConnectionRole::Producer`] at a time;
/// any number may be [`ConnectionRole::Observer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// Connected, no role requested yet.
    #[default]
    Unregistered,
    /// The single device allowed to submit detections ("detector").
    Producer,
    /// Read-only viewer ("dashboard").
    Observer,
}

impl ConnectionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionRole::Unregistered => "unregistered",
            ConnectionRole::Producer => "producer",
            ConnectionRole::Observer => "observer",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
