//! Wire shapes returned to the host process.

use serde::{Deserialize, Serialize};

/// Result of a context injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInjection {
    #[serde(rename = "type")]
    pub kind: String,
    pub workspace_id: String,
    pub session_id: String,
    pub memory_count: usize,
    /// The assembled context block; not part of the envelope header.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub context: String,
}

/// Result of an event capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub memory_id: String,
    pub workspace_id: String,
    pub session_id: String,
}
