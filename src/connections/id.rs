use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport-assigned connection identifier.
///
/// Cheap to clone (`Arc<str>`). Adapters may supply their own ids
/// (socket ids, peer addresses) or call [`ConnectionId::generate`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    /// Generates a unique id of the form `conn_<uuid>`.
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<ConnectionId> for Arc<str> {
    fn from(value: ConnectionId) -> Self {
        value.0
    }
}

impl From<&ConnectionId> for Arc<str> {
    fn from(value: &ConnectionId) -> Self {
        Arc::clone(&value.0)
    }
}
