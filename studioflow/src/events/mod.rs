//! Event sink system for notifications and observability.

mod channel;
mod sink;

pub use channel::{ChannelEventSink, EventStream};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
