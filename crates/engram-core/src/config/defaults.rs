//! Default values shared by the config structs.

pub const DEFAULT_DB_PATH: &str = "engram.db";
pub const DEFAULT_BLOB_ROOT: &str = "blobs";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

pub const DEFAULT_L1_MAX_ENTRIES: usize = 1_000;

pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_MAX_ACTIVE_SESSIONS: usize = 50;
pub const DEFAULT_SESSION_CLEANUP_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_MONITOR_INTERVAL_MS: i64 = 5_000;
pub const DEFAULT_MONITOR_HISTORY_SIZE: usize = 100;
pub const DEFAULT_ALERT_COOLDOWN_MS: u64 = 60_000;

pub const DEFAULT_MAX_REQUESTS: i64 = 100;
pub const DEFAULT_WINDOW_MS: i64 = 60_000;
pub const DEFAULT_LIMITER_TTL_MS: u64 = 10 * 60 * 1_000;
