//! Runtime core: the hub actor and everything around it.
//!
//! The public API from this module is [`Hub`], [`HubHandle`], [`HubBuilder`] and
//! [`Config`], plus the operation outcomes [`SessionStart`], [`Departure`] and
//! [`HubStatus`].
//!
//! Internal modules:
//! - [`actor`]: the single task that owns and mutates hub state;
//! - [`state`]: the state itself and shared helpers (baseline, presence, evictions);
//! - [`lifecycle`]: session start/stop and connection coordination;
//! - [`hub`]: owner of the background tasks and the cloneable handle;
//! - [`builder`]: wires bus, subscribers, persistence and actor together;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod actor;
mod builder;
mod config;
mod hub;
mod lifecycle;
mod shutdown;
mod state;

pub use builder::HubBuilder;
pub use config::Config;
pub use hub::{Hub, HubHandle};
pub use lifecycle::{Departure, HubStatus, SessionStart};
pub use shutdown::wait_for_shutdown_signal;
