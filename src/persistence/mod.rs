//! Outbound persistence port.
//!
//! ## Contents
//! - [`Persistence`] backend trait (session start, detection, session stop)
//! - [`PersistOp`] queued unit of work
//! - [`PersistenceQueue`] bounded fire-and-forget worker in front of a backend
//! - [`MemoryPersistence`] in-memory recording backend

mod memory;
mod port;
mod queue;

pub use memory::MemoryPersistence;
pub use port::{PersistOp, Persistence};
pub use queue::PersistenceQueue;
