//! # LogWriter — runtime events to `tracing`
//!
//! A minimal subscriber that renders incoming [`Event`]s as structured `tracing`
//! records under the `qcvisor::events` target. The hub already logs its own
//! decisions; this writer is the full event trail, mostly at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG qcvisor::events: session_started seq=0 session=0192... totals=(0, 0)
//! DEBUG qcvisor::events: detection_recorded seq=3 session=0192... totals=(3, 1)
//!  WARN qcvisor::events: producer_rejected seq=4 connection=conn_b reason=already_registered
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let session = e.session.map(|s| s.to_string());
        match e.kind {
            EventKind::ProducerRejected
            | EventKind::UnauthorizedDetection
            | EventKind::ObserverEvicted
            | EventKind::PersistenceFailed
            | EventKind::PersistenceOverflow
            | EventKind::SubscriberPanicked => {
                warn!(
                    target: "qcvisor::events",
                    seq = e.seq,
                    connection = e.connection.as_deref(),
                    session = session.as_deref(),
                    reason = e.reason.as_deref(),
                    "{label}"
                );
            }
            // Logging an overflow could itself overflow; keep it quiet.
            EventKind::SubscriberOverflow => {}
            _ => {
                debug!(
                    target: "qcvisor::events",
                    seq = e.seq,
                    connection = e.connection.as_deref(),
                    session = session.as_deref(),
                    totals = ?e.totals,
                    reason = e.reason.as_deref(),
                    "{label}"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
