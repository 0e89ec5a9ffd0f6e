//! Detection input, output, and the aggregator that folds one into the other.
//!
//! - [`DetectionEvent`] inbound `{baik, cacat}` delta (lenient parsing)
//! - [`DetectionRecord`] immutable post-update snapshot, one per accepted event
//! - [`Aggregator`] validation + fold into the [`SessionStore`](crate::session::SessionStore)

mod aggregator;
mod event;
mod record;

pub use aggregator::Aggregator;
pub use event::DetectionEvent;
pub use record::DetectionRecord;
