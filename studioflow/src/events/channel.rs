//! Channel-backed event sink for consumers that want a stream of events,
//! such as a UI showing notifications.

use super::EventSink;
use crate::core::StageEvent;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::warn;

/// Sends events into a bounded queue read through an [`EventStream`].
///
/// `emit` waits for room; `try_emit` drops the event when the queue is full
/// and counts the drop. Events sent after the stream is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<StageEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelEventSink {
    /// Creates a sink and the stream that receives its events.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            EventStream { rx },
        )
    }

    /// Number of events dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: StageEvent) {
        let _ = self.tx.send(event).await;
    }

    fn try_emit(&self, event: StageEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.tx.try_send(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(event_type = %event.event_type, "Event queue full, dropping event");
        }
    }
}

/// The receiving end of a [`ChannelEventSink`].
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StageEvent>,
}

impl EventStream {
    /// Receives the next event, or `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<StageEvent> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = StageEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
