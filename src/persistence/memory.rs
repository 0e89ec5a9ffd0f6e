use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;

use super::port::{PersistOp, Persistence};
use crate::{detection::DetectionRecord, error::PersistError, session::LiveSession};

/// In-memory [`Persistence`] backend that records every call.
///
/// Handy as a test double and as a reference for real backends.
/// [`MemoryPersistence::failing`] builds one that rejects every write (still recording it).
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    ops: Mutex<Vec<PersistOp>>,
    fail: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    /// Switches failure mode on or off.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Everything received so far, in arrival order.
    pub fn ops(&self) -> Vec<PersistOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn detections(&self) -> Vec<DetectionRecord> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                PersistOp::Detection(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: PersistOp) -> Result<(), PersistError> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
        if self.fail.load(Ordering::Relaxed) {
            return Err(PersistError::Backend("memory backend set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn persist_session_start(&self, session: &LiveSession) -> Result<(), PersistError> {
        self.record(PersistOp::SessionStarted(session.clone()))
    }

    async fn persist_detection(&self, record: &DetectionRecord) -> Result<(), PersistError> {
        self.record(PersistOp::Detection(record.clone()))
    }

    async fn persist_session_stop(&self, session: &LiveSession) -> Result<(), PersistError> {
        self.record(PersistOp::SessionStopped(session.clone()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
