//! # Hub: owner of the running core, and its cloneable handle.
//!
//! [`Hub`] is returned by [`HubBuilder::build`](super::HubBuilder::build) and owns
//! the background tasks. [`HubHandle`] is what adapters clone into their
//! connection tasks; it is the inbound port of the core.
//!
//! ## Example
//! ```rust
//! use qcvisor::{Config, DetectionEvent, Hub, HubError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), HubError> {
//!     let hub = Hub::builder(Config::default()).build();
//!     let handle = hub.handle();
//!
//!     handle.start_session().await?;
//!     handle.submit_detection(DetectionEvent::new(3, 1)).await?;
//!     let record = handle.submit_detection(DetectionEvent::new(0, 2)).await?;
//!     assert_eq!((record.total_baik, record.total_cacat), (3, 3));
//!
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{
    actor::Command,
    builder::HubBuilder,
    config::Config,
    lifecycle::{Departure, HubStatus, SessionStart},
};
use crate::{
    broadcast::ObserverStream,
    connections::ConnectionId,
    detection::{DetectionEvent, DetectionRecord},
    error::HubError,
    session::LiveSession,
};

/// Cloneable entry point into the hub actor.
///
/// Every method fails with [`HubError::Closed`] once the hub has shut down.
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<Command>,
}

impl HubHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Starts a session, or returns the active one unchanged.
    pub async fn start_session(&self) -> Result<SessionStart, HubError> {
        self.request(|reply| Command::StartSession { reply }).await
    }

    /// Stops the active session. `Ok(None)` when there was none.
    pub async fn stop_session(&self) -> Result<Option<LiveSession>, HubError> {
        self.request(|reply| Command::StopSession { reply }).await
    }

    /// Submits a delta from a trusted caller (e.g. the device's HTTP client).
    pub async fn submit_detection(&self, event: DetectionEvent) -> Result<DetectionRecord, HubError> {
        self.request(|reply| Command::SubmitDetection {
            from: None,
            event,
            reply,
        })
        .await?
    }

    /// Submits a delta on behalf of `connection`; rejected unless it is the producer.
    pub async fn submit_detection_from(
        &self,
        connection: &ConnectionId,
        event: DetectionEvent,
    ) -> Result<DetectionRecord, HubError> {
        self.request(|reply| Command::SubmitDetection {
            from: Some(connection.clone()),
            event,
            reply,
        })
        .await?
    }

    /// Reports a new transport connection. `false` if the id was already known.
    pub async fn connect(&self, id: &ConnectionId) -> Result<bool, HubError> {
        self.request(|reply| Command::Connect {
            id: id.clone(),
            reply,
        })
        .await
    }

    /// Claims the producer role for `id` and ensures a session is active.
    pub async fn register_producer(&self, id: &ConnectionId) -> Result<SessionStart, HubError> {
        self.request(|reply| Command::RegisterProducer {
            id: id.clone(),
            reply,
        })
        .await?
    }

    /// Registers `id` as an observer; the stream starts with the baseline.
    pub async fn register_observer(&self, id: &ConnectionId) -> Result<ObserverStream, HubError> {
        self.request(|reply| Command::RegisterObserver {
            id: id.clone(),
            reply,
        })
        .await?
    }

    /// Queues the baseline again on an observer's stream. `false` if `id` is not an observer.
    pub async fn resync(&self, id: &ConnectionId) -> Result<bool, HubError> {
        self.request(|reply| Command::Resync {
            id: id.clone(),
            reply,
        })
        .await
    }

    /// Reports a lost connection. Producer loss stops the active session.
    pub async fn disconnect(&self, id: &ConnectionId) -> Result<Departure, HubError> {
        self.request(|reply| Command::Disconnect {
            id: id.clone(),
            reply,
        })
        .await
    }

    /// Current (or last stopped) session.
    pub async fn current(&self) -> Result<Option<LiveSession>, HubError> {
        self.request(|reply| Command::Current { reply }).await
    }

    pub async fn is_producer(&self, id: &ConnectionId) -> Result<bool, HubError> {
        self.request(|reply| Command::IsProducer {
            id: id.clone(),
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<HubStatus, HubError> {
        self.request(|reply| Command::Status { reply }).await
    }
}

/// Running hub: actor + event listener (+ persistence worker).
///
/// Dropping it without [`Hub::shutdown`] cancels the background tasks without
/// waiting for them.
pub struct Hub {
    handle: HubHandle,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    actor: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl Hub {
    /// Shortcut for [`HubBuilder::new`].
    pub fn builder(cfg: Config) -> HubBuilder {
        HubBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        handle: HubHandle,
        runtime_token: CancellationToken,
        listener_token: CancellationToken,
        actor: JoinHandle<()>,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            handle,
            runtime_token,
            listener_token,
            actor,
            listener,
        }
    }

    /// Returns a new handle to the actor.
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Stops the actor, then drains persistence and subscribers.
    ///
    /// Observer streams end; later handle calls fail with [`HubError::Closed`].
    pub async fn shutdown(mut self) {
        self.runtime_token.cancel();
        let _ = (&mut self.actor).await;
        self.listener_token.cancel();
        let _ = (&mut self.listener).await;
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.listener_token.cancel();
    }
}
