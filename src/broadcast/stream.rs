use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use super::message::ObserverMessage;
use crate::connections::ConnectionId;

/// Receiving end of one observer's queue.
///
/// The first items are always the baseline (`session_stats`, then `detector_status`),
/// followed by live messages in publish order. The stream ends when the observer
/// disconnects, is evicted, or the hub shuts down.
#[derive(Debug)]
pub struct ObserverStream {
    id: ConnectionId,
    rx: mpsc::Receiver<Arc<ObserverMessage>>,
}

impl ObserverStream {
    pub(crate) fn new(id: ConnectionId, rx: mpsc::Receiver<Arc<ObserverMessage>>) -> Self {
        Self { id, rx }
    }

    /// Connection this stream belongs to.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Waits for the next message; `None` once the hub dropped this observer.
    pub async fn recv(&mut self) -> Option<Arc<ObserverMessage>> {
        self.rx.recv().await
    }

    /// Returns a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<ObserverMessage>> {
        self.rx.try_recv().ok()
    }

    /// Drains everything currently queued.
    pub fn drain(&mut self) -> Vec<Arc<ObserverMessage>> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

impl Stream for ObserverStream {
    type Item = Arc<ObserverMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
