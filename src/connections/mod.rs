//! Connection identity, roles, and the registrar that arbitrates the producer slot.

mod id;
mod registrar;
mod role;

pub use id::ConnectionId;
pub use registrar::{Admission, Registrar, Unregistered};
pub use role::ConnectionRole;
