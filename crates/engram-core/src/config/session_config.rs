use serde::{Deserialize, Serialize};

use super::defaults;

/// Session manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle window after which a session stops being active (seconds).
    pub session_timeout_secs: u64,
    /// Cap on concurrently active sessions.
    pub max_active_sessions: usize,
    /// Interval between periodic cleanup sweeps (seconds).
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: defaults::DEFAULT_SESSION_TIMEOUT_SECS,
            max_active_sessions: defaults::DEFAULT_MAX_ACTIVE_SESSIONS,
            cleanup_interval_secs: defaults::DEFAULT_SESSION_CLEANUP_INTERVAL_SECS,
        }
    }
}
