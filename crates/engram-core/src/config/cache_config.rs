use serde::{Deserialize, Serialize};

use super::defaults;

/// Multi-level cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entry count for the in-process L1 tier.
    pub l1_max_entries: usize,
    /// Default TTL applied when `set` is called without one (milliseconds).
    pub default_ttl_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_entries: defaults::DEFAULT_L1_MAX_ENTRIES,
            default_ttl_ms: None,
        }
    }
}
