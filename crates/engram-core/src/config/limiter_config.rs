use serde::{Deserialize, Serialize};

use super::defaults;

/// Window accounting strategy for the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStrategy {
    #[default]
    Sliding,
    Fixed,
}

/// Rate limiter configuration. Non-positive `max_requests` or `window_ms`
/// are rejected at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub max_requests: i64,
    pub window_ms: i64,
    pub strategy: WindowStrategy,
    /// Prefix applied to every key, namespacing limiter instances.
    pub key_prefix: String,
    /// Idle keys older than this are evicted by `cleanup` (milliseconds).
    pub ttl_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: defaults::DEFAULT_MAX_REQUESTS,
            window_ms: defaults::DEFAULT_WINDOW_MS,
            strategy: WindowStrategy::Sliding,
            key_prefix: String::new(),
            ttl_ms: defaults::DEFAULT_LIMITER_TTL_MS,
        }
    }
}
