//! Studio event type for lifecycle notifications.

use super::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted while a project moves through its stages.
///
/// Events are what the user sees as notifications; sinks can also log or
/// collect them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// The event type (e.g., "stage.started", "export.item_failed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl StageEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns the payload as a JSON object.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::Value::Object(self.data.clone().into_iter().collect())
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn started(stage: StageId) -> Self {
        Self::new("stage.started").add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn completed(stage: StageId, items: usize, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("items", serde_json::json!(items))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn failed(stage: StageId, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "stage.approved" event.
    #[must_use]
    pub fn approved(stage: StageId) -> Self {
        Self::new("stage.approved").add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "stage.rejected" event.
    #[must_use]
    pub fn rejected(stage: StageId) -> Self {
        Self::new("stage.rejected").add_data("stage", serde_json::json!(stage))
    }

    /// Creates an "item.generated" event for one item of a batch stage.
    #[must_use]
    pub fn item_generated(stage: StageId, index: usize, total: usize) -> Self {
        Self::new("item.generated")
            .add_data("stage", serde_json::json!(stage))
            .add_data("index", serde_json::json!(index))
            .add_data("total", serde_json::json!(total))
    }
}
