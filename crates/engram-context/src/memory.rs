//! Input shape for the context builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrieved memory, as handed over by the storage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMemory {
    pub id: String,
    pub content: String,
    /// Relevance score, higher is better.
    pub score: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// The event type tag driving renderer selection.
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl RetrievedMemory {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            timestamp: None,
            event_type: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Entries missing an id or content are dropped by the builder.
    pub fn is_renderable(&self) -> bool {
        !self.id.is_empty() && !self.content.is_empty()
    }
}
