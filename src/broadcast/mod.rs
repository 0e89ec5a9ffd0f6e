//! Observer fan-out: wire messages, per-observer queues, and receiving streams.
//!
//! ## Contents
//! - [`ObserverMessage`], [`StatusEvent`] what observers receive
//! - [`BroadcastHub`] non-blocking fan-out with slow-observer eviction
//! - [`ObserverStream`] the receiving end handed to the transport adapter

mod hub;
mod message;
mod stream;

pub use hub::{BroadcastHub, Delivery};
pub use message::{ObserverMessage, StatusEvent};
pub use stream::ObserverStream;
