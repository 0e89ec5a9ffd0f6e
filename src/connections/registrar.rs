//! # Connection registrar - producer arbitration and role lookup.
//!
//! Tracks the role of every live connection and arbitrates the single producer slot.
//!
//! ## Architecture
//! ```text
//! hub actor ──► Registrar
//!                 ├─► connect(id)            → Unregistered entry
//!                 ├─► register_producer(id)  → Ok | AlreadyRegistered | RoleConflict
//!                 ├─► register_observer(id)  → Ok | RoleConflict
//!                 ├─► unregister(id)         → Unregistered { role, was_producer }
//!                 └─► is_producer(id)        → authorizes inbound detections
//! ```
//!
//! ## Rules
//! - At most one producer; a second attempt is **rejected**, never queued or swapped in.
//! - A connection keeps the role it first registered with.
//! - Unregistering an observer or an unknown id is a no-op.
//! - Roles are looked up by id only, never inferred from transport identity.

use std::collections::HashMap;

use super::{id::ConnectionId, role::ConnectionRole};
use crate::error::HubError;

/// Outcome of [`Registrar::unregister`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unregistered {
    /// Role the connection held (`Unregistered` if it was unknown).
    pub role: ConnectionRole,
    /// The departing connection was the producer; the caller must tear the session down.
    pub was_producer: bool,
}

/// Outcome of a successful registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Role newly granted.
    Granted,
    /// Connection already held this role; nothing changed.
    AlreadyHeld,
}

/// Role table for live connections.
#[derive(Debug, Default)]
pub struct Registrar {
    roles: HashMap<ConnectionId, ConnectionRole>,
    producer: Option<ConnectionId>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened connection. Returns `false` if it was already known.
    pub fn connect(&mut self, id: ConnectionId) -> bool {
        let mut inserted = false;
        self.roles.entry(id).or_insert_with(|| {
            inserted = true;
            ConnectionRole::Unregistered
        });
        inserted
    }

    /// Claims the producer slot for `id`.
    pub fn register_producer(&mut self, id: &ConnectionId) -> Result<Admission, HubError> {
        if let Some(incumbent) = &self.producer {
            if incumbent == id {
                return Ok(Admission::AlreadyHeld);
            }
            return Err(HubError::AlreadyRegistered {
                incumbent: incumbent.clone(),
            });
        }
        self.check_role(id, ConnectionRole::Producer)?;

        self.roles.insert(id.clone(), ConnectionRole::Producer);
        self.producer = Some(id.clone());
        Ok(Admission::Granted)
    }

    /// Grants the observer role. Unbounded.
    pub fn register_observer(&mut self, id: &ConnectionId) -> Result<Admission, HubError> {
        if self.role(id) == ConnectionRole::Observer {
            return Ok(Admission::AlreadyHeld);
        }
        self.check_role(id, ConnectionRole::Observer)?;

        self.roles.insert(id.clone(), ConnectionRole::Observer);
        Ok(Admission::Granted)
    }

    /// Forgets `id`, clearing the producer slot if it held it.
    pub fn unregister(&mut self, id: &ConnectionId) -> Unregistered {
        let role = self.roles.remove(id).unwrap_or_default();
        let was_producer = self.producer.as_ref() == Some(id);
        if was_producer {
            self.producer = None;
        }
        Unregistered { role, was_producer }
    }

    #[inline]
    pub fn is_producer(&self, id: &ConnectionId) -> bool {
        self.producer.as_ref() == Some(id)
    }

    pub fn producer(&self) -> Option<&ConnectionId> {
        self.producer.as_ref()
    }

    /// Role of `id` (`Unregistered` when unknown).
    pub fn role(&self, id: &ConnectionId) -> ConnectionRole {
        self.roles.get(id).copied().unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.roles
            .values()
            .filter(|r| matches!(r, ConnectionRole::Observer))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.roles.len()
    }

    fn check_role(&self, id: &ConnectionId, wanted: ConnectionRole) -> Result<(), HubError> {
        match self.role(id) {
            ConnectionRole::Unregistered => Ok(()),
            current if current == wanted => Ok(()),
            current => Err(HubError::RoleConflict {
                connection: id.clone(),
                current,
            }),
        }
    }
}
