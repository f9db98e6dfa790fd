//! Build options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    #[default]
    Markdown,
    Plain,
}

/// Options controlling a context build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    pub format: ContextFormat,
    /// Byte budget for the final artifact.
    pub max_size: usize,
    pub include_metadata: bool,
    pub include_score: bool,
    /// Pairwise content similarity at or above this clusters entries;
    /// 1.0 disables deduplication.
    pub deduplicate_threshold: f64,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            format: ContextFormat::Markdown,
            max_size: 8 * 1024,
            include_metadata: false,
            include_score: false,
            deduplicate_threshold: 0.85,
        }
    }
}
