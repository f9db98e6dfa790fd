//! In-process level backed by moka.
//!
//! TinyLFU admission, size-aware eviction. TTL is configured per level;
//! the per-entry TTL hint is ignored here.

use std::time::Duration;

use moka::sync::Cache;
use serde_json::Value;

use engram_core::EngramResult;

use crate::level::CacheLevel;

/// A moka-backed cache tier.
pub struct MokaLevel {
    cache: Cache<String, Value>,
}

impl MokaLevel {
    /// Create a level with the given max entry count and optional
    /// level-wide TTL.
    pub fn new(max_entries: u64, time_to_live: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries);
        if let Some(ttl) = time_to_live {
            builder = builder.time_to_live(ttl);
        }
        Self {
            cache: builder.build(),
        }
    }
}

impl CacheLevel for MokaLevel {
    fn name(&self) -> &str {
        "moka"
    }

    fn get(&self, key: &str) -> EngramResult<Option<Value>> {
        Ok(self.cache.get(key))
    }

    fn set(&self, key: &str, value: &Value, _ttl: Option<Duration>) -> EngramResult<()> {
        self.cache.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> EngramResult<bool> {
        Ok(self.cache.remove(key).is_some())
    }

    fn has(&self, key: &str) -> EngramResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    fn clear(&self) -> EngramResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn keys(&self) -> EngramResult<Vec<String>> {
        Ok(self.cache.iter().map(|(k, _)| (*k).clone()).collect())
    }

    fn size(&self) -> EngramResult<usize> {
        self.cache.run_pending_tasks();
        Ok(self.cache.entry_count() as usize)
    }
}
