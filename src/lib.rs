//! # qcvisor
//!
//! **qcvisor** is the live aggregation core of an inspection line: one producer
//! device streams `baik`/`cacat` counts, the core folds them into a single live
//! session, and any number of observers watch the running totals in real time.
//!
//! The transport (HTTP/WebSocket) and the storage backend are adapters around
//! the core. The optional `server` feature ships an axum adapter and the
//! `qcvisor` binary.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer conn        observer conns          HTTP device client
//!        │                   │   │                      │
//!        ▼                   ▼   ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  HubHandle (clone per connection)                                 │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼ Command + oneshot reply (bounded mpsc)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  HubActor (single serialization point) owns HubState:             │
//! │  - SessionStore  (one LiveSession, running totals)                │
//! │  - Aggregator    (validate + fold deltas → DetectionRecord)       │
//! │  - Registrar     (producer slot, observer roles)                  │
//! │  - BroadcastHub  (per-observer bounded queues, try_send only)     │
//! └──────┬───────────────────────┬───────────────────────┬────────────┘
//!        ▼                       ▼                       ▼
//!  ObserverStream × N     PersistenceQueue          Bus (runtime events)
//!  (baseline, then live)  └─► worker ─► Persistence  └─► listener ─► SubscriberSet
//!                                                                   ├─► LogWriter
//!                                                                   └─► custom Subscribe
//! ```
//!
//! ### Session lifecycle
//! ```text
//! register_producer / start ──► NoSession ──► Active ──► publish detector_status{connected:true}
//! submit_detection          ──► Active: totals += delta ──► publish detection
//! stop / producer lost      ──► Active ──► NoSession ──► publish detector_status{connected:false}
//! start while Active        ──► returns the live session (no reset)
//! stop while NoSession      ──► no-op
//! producer granted / lost   ──► publish detector_status{connected:true|false} (once per change)
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Hub**           | Actor owning the session, roles and observer fan-out.          | [`Hub`], [`HubHandle`], [`HubBuilder`]      |
//! | **Session**       | The single live session and its totals.                        | [`LiveSession`], [`SessionId`]              |
//! | **Detections**    | Input deltas and immutable per-event records.                  | [`DetectionEvent`], [`DetectionRecord`]     |
//! | **Connections**   | Producer arbitration and observer roles.                       | [`ConnectionId`], [`ConnectionRole`]        |
//! | **Observers**     | Ordered per-observer streams starting with a baseline.         | [`ObserverStream`], [`ObserverMessage`]     |
//! | **Persistence**   | Fire-and-forget outbound storage port.                         | [`Persistence`], [`MemoryPersistence`]      |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).           | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed, recoverable rejections.                                 | [`HubError`], [`PersistError`]              |
//! | **Configuration** | Queue sizes and eviction threshold.                            | [`Config`]                                  |
//!
//! ## Optional features
//! - `server`: axum HTTP + WebSocket adapter ([`server`]) and the `qcvisor` binary.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use qcvisor::{
//!     Config, ConnectionId, DetectionEvent, Hub, LogWriter, MemoryPersistence, ObserverMessage, Subscribe,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryPersistence::new());
//!     let hub = Hub::builder(Config::default())
//!         .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!         .with_persistence(store.clone())
//!         .build();
//!     let handle = hub.handle();
//!
//!     let dashboard = ConnectionId::from("dashboard-1");
//!     let mut stream = handle.register_observer(&dashboard).await?;
//!
//!     let raspi = ConnectionId::from("raspi");
//!     handle.register_producer(&raspi).await?;
//!     handle.submit_detection_from(&raspi, DetectionEvent::new(1, 0)).await?;
//!
//!     // Baseline first, then live messages in order.
//!     let first = stream.recv().await.ok_or("stream ended")?;
//!     assert!(matches!(*first, ObserverMessage::SessionStats(None)));
//!
//!     handle.disconnect(&raspi).await?;
//!     hub.shutdown().await;
//!     assert_eq!(store.ops().len(), 3);
//!     Ok(())
//! }
//! ```

mod broadcast;
mod connections;
mod core;
mod detection;
mod error;
mod events;
mod persistence;
mod session;
mod subscribers;

// ---- Public re-exports ----

pub use broadcast::{BroadcastHub, Delivery, ObserverMessage, ObserverStream, StatusEvent};
pub use connections::{Admission, ConnectionId, ConnectionRole, Registrar, Unregistered};
pub use core::{
    Config, Departure, Hub, HubBuilder, HubHandle, HubStatus, SessionStart, wait_for_shutdown_signal,
};
pub use detection::{Aggregator, DetectionEvent, DetectionRecord};
pub use error::{HubError, PersistError};
pub use events::{Bus, Event, EventKind};
pub use persistence::{MemoryPersistence, PersistOp, Persistence, PersistenceQueue};
pub use session::{LiveSession, SessionId, SessionStatus, SessionStore};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};

// Optional: axum transport adapter.
// Enable with: `--features server`
#[cfg(feature = "server")]
pub mod server;
