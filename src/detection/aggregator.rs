//! # Detection aggregator.
//!
//! Validates a [`DetectionEvent`] and folds it into the live session.
//!
//! ## Flow
//! ```text
//! record(event)
//!   ├─► baik < 0 or cacat < 0  ─► Err(InvalidDetection)   (no side effect)
//!   ├─► store.apply_delta()    ─► Err(NoActiveSession)    (no side effect)
//!   └─► DetectionRecord::from_snapshot(updated session)
//! ```
//!
//! ## Rules
//! - Exactly one store mutation and one record per successful call.
//! - Negative deltas are never subtracted; totals stay monotone.
//! - No fan-out here: the caller publishes the record.

use super::{event::DetectionEvent, record::DetectionRecord};
use crate::{error::HubError, session::SessionStore};

/// Stateless fold of detection deltas into a [`SessionStore`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Applies one delta and returns its record.
    pub fn record(
        &self,
        store: &mut SessionStore,
        event: &DetectionEvent,
    ) -> Result<DetectionRecord, HubError> {
        let baik = non_negative("baik", event.baik)?;
        let cacat = non_negative("cacat", event.cacat)?;

        let session = store.apply_delta(baik, cacat)?;
        Ok(DetectionRecord::from_snapshot(baik, cacat, &session))
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, HubError> {
    u64::try_from(value).map_err(|_| HubError::InvalidDetection {
        field,
        value: value.to_string(),
    })
}
