use async_trait::async_trait;

use crate::{detection::DetectionRecord, error::PersistError, session::LiveSession};

/// Outbound persistence port.
///
/// Calls arrive from a dedicated worker after the hub committed the matching
/// state transition, one at a time, in commit order. Failures are reported and
/// never roll back or block the hub.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    async fn persist_session_start(&self, session: &LiveSession) -> Result<(), PersistError>;

    async fn persist_detection(&self, record: &DetectionRecord) -> Result<(), PersistError>;

    async fn persist_session_stop(&self, session: &LiveSession) -> Result<(), PersistError>;

    /// Name used in logs and events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// One unit of work for the persistence worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistOp {
    SessionStarted(LiveSession),
    Detection(DetectionRecord),
    SessionStopped(LiveSession),
}

impl PersistOp {
    pub fn as_label(&self) -> &'static str {
        match self {
            PersistOp::SessionStarted(_) => "persist_session_start",
            PersistOp::Detection(_) => "persist_detection",
            PersistOp::SessionStopped(_) => "persist_session_stop",
        }
    }

    pub(crate) async fn apply(&self, backend: &dyn Persistence) -> Result<(), PersistError> {
        match self {
            PersistOp::SessionStarted(s) => backend.persist_session_start(s).await,
            PersistOp::Detection(r) => backend.persist_detection(r).await,
            PersistOp::SessionStopped(s) => backend.persist_session_stop(s).await,
        }
    }

    pub(crate) fn session_id(&self) -> crate::session::SessionId {
        match self {
            PersistOp::SessionStarted(s) | PersistOp::SessionStopped(s) => s.session_id,
            PersistOp::Detection(r) => r.session_id,
        }
    }
}
