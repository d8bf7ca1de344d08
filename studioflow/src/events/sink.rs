//! Event sink trait and implementations.

use crate::core::StageEvent;
use async_trait::async_trait;
use tracing::{debug, info, warn, Level};

/// Trait for event sinks that receive studio events.
///
/// A UI would implement this to show notifications; the crate ships a
/// logging sink and a collecting sink for tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: StageEvent);

    /// Emits an event without blocking. Must never panic.
    fn try_emit(&self, event: StageEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: StageEvent) {}

    fn try_emit(&self, _event: StageEvent) {}
}

/// An event sink that logs events using the tracing framework.
///
/// Failure events (`*.failed`, `*.item_failed`) are always logged at WARN.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &StageEvent) {
        let payload = event.payload();
        if event.event_type.ends_with("failed") {
            warn!(event_type = %event.event_type, event_data = %payload, "Event: {}", event.event_type);
        } else if self.level == Level::DEBUG {
            debug!(event_type = %event.event_type, event_data = %payload, "Event: {}", event.event_type);
        } else {
            info!(event_type = %event.event_type, event_data = %payload, "Event: {}", event.event_type);
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<StageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageId;

    #[tokio::test]
    async fn test_noop_and_logging_sinks() {
        NoOpEventSink.emit(StageEvent::started(StageId::Script)).await;
        let sink = LoggingEventSink::default();
        sink.emit(StageEvent::failed(StageId::Script, "boom")).await;
        sink.try_emit(StageEvent::approved(StageId::Script));
    }

    #[tokio::test]
    async fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(StageEvent::started(StageId::Images)).await;
        sink.emit(StageEvent::item_generated(StageId::Images, 0, 2)).await;
        sink.try_emit(StageEvent::completed(StageId::Images, 2, 10.0));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.event_types()[1], "item.generated");

        sink.clear();
        assert!(sink.is_empty());
    }
}
