//! Error types used by the qcvisor core and its persistence port.
//!
//! This module defines two error enums:
//!
//! - [`HubError`] — rejections and failures returned by hub operations.
//! - [`PersistError`] — failures reported by a [`Persistence`](crate::Persistence) backend.
//!
//! Every [`HubError`] is local and recoverable: the caller (usually a transport adapter)
//! decides how to surface it. None of them is process-fatal.

use thiserror::Error;

use crate::connections::{ConnectionId, ConnectionRole};

/// # Errors produced by hub operations.
///
/// Rejections (`NoActiveSession`, `InvalidDetection`, `Unauthorized`, `AlreadyRegistered`,
/// `RoleConflict`) leave hub state untouched. `Closed` means the hub actor is gone.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A mutating operation needs an active session and there is none.
    #[error("no active session")]
    NoActiveSession,

    /// A detection count is negative or malformed.
    #[error("invalid detection: {field}={value}")]
    InvalidDetection {
        /// Offending field (`baik` or `cacat`).
        field: &'static str,
        /// Raw value as received.
        value: String,
    },

    /// Detection submitted by a connection that does not hold the producer role.
    #[error("connection {connection} is not the registered producer")]
    Unauthorized {
        /// Connection that attempted to submit.
        connection: ConnectionId,
    },

    /// Another connection already holds the producer role.
    #[error("producer already registered by {incumbent}")]
    AlreadyRegistered {
        /// Connection currently holding the producer role.
        incumbent: ConnectionId,
    },

    /// The connection already registered with a different role.
    #[error("connection {connection} already registered as {current}")]
    RoleConflict {
        /// Connection that attempted to re-register.
        connection: ConnectionId,
        /// Role it already holds.
        current: ConnectionRole,
    },

    /// The hub actor has shut down.
    #[error("hub is closed")]
    Closed,
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics and adapter responses.
    ///
    /// # Example
    /// ```
    /// use qcvisor::HubError;
    ///
    /// assert_eq!(HubError::NoActiveSession.as_label(), "no_active_session");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::NoActiveSession => "no_active_session",
            HubError::InvalidDetection { .. } => "invalid_detection",
            HubError::Unauthorized { .. } => "unauthorized",
            HubError::AlreadyRegistered { .. } => "already_registered",
            HubError::RoleConflict { .. } => "role_conflict",
            HubError::Closed => "hub_closed",
        }
    }

    /// Returns `true` for errors that reject a single request and leave the hub usable.
    ///
    /// Only [`HubError::Closed`] is not a rejection.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, HubError::Closed)
    }
}

/// # Errors produced by a persistence backend.
///
/// The core never retries or rolls back on these; it reports them as
/// [`EventKind::PersistenceFailed`](crate::EventKind::PersistenceFailed).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// Backend-specific failure.
    #[error("persistence backend failed: {0}")]
    Backend(String),
}

impl PersistError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PersistError::Backend(_) => "persist_backend",
        }
    }
}
