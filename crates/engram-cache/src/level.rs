//! The capability set implemented by every pluggable cache level.

use std::time::Duration;

use serde_json::Value;

use engram_core::EngramResult;

/// A cache tier. Lower levels may be absent; the multi-level cache
/// treats every level uniformly through this contract.
pub trait CacheLevel: Send + Sync {
    /// Human-readable level name for logs.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> EngramResult<Option<Value>>;

    fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> EngramResult<()>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> EngramResult<bool>;

    fn has(&self, key: &str) -> EngramResult<bool>;

    fn clear(&self) -> EngramResult<()>;

    fn keys(&self) -> EngramResult<Vec<String>>;

    fn size(&self) -> EngramResult<usize>;
}
