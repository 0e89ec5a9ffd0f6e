//! Live aggregation session: data model and single-owner store.
//!
//! ## Contents
//! - [`LiveSession`], [`SessionId`], [`SessionStatus`] session snapshot types
//! - [`SessionStore`] holder of the one current session (owned by the hub actor)

mod store;
mod types;

pub use store::SessionStore;
pub use types::{LiveSession, SessionId, SessionStatus};
