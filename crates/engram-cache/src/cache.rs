//! MultiLevelCache — the read-through/write-through coordinator.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use engram_core::config::CacheConfig;
use engram_core::EngramResult;

use crate::l1::{EvictionPolicy, L1Store};
use crate::level::CacheLevel;
use crate::stats::{CacheStats, Counters};

/// Three-tier cache. L1 is always present; L2/L3 are optional plug-ins.
pub struct MultiLevelCache {
    l1: Mutex<L1Store>,
    l2: Option<Arc<dyn CacheLevel>>,
    l3: Option<Arc<dyn CacheLevel>>,
    /// Per-key promotions in flight; losers await the winner's cell.
    in_flight: DashMap<String, Arc<OnceCell<Option<Value>>>>,
    counters: Counters,
    default_ttl: Option<Duration>,
}

impl MultiLevelCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_policy(config, None)
    }

    /// Construct with an injected L1 eviction policy.
    pub fn with_policy(config: &CacheConfig, policy: Option<Box<EvictionPolicy>>) -> Self {
        Self {
            l1: Mutex::new(L1Store::new(config.l1_max_entries, policy)),
            l2: None,
            l3: None,
            in_flight: DashMap::new(),
            counters: Counters::default(),
            default_ttl: config.default_ttl_ms.map(Duration::from_millis),
        }
    }

    pub fn with_l2(mut self, level: Arc<dyn CacheLevel>) -> Self {
        self.l2 = Some(level);
        self
    }

    pub fn with_l3(mut self, level: Arc<dyn CacheLevel>) -> Self {
        self.l3 = Some(level);
        self
    }

    fn l1_lock(&self) -> std::sync::MutexGuard<'_, L1Store> {
        // L1 operations never panic while holding the lock; recover anyway.
        self.l1.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read-through lookup. Concurrent misses on the same key share one
    /// promotion; every caller observes the winner's result.
    pub async fn get(&self, key: &str) -> Option<Value> {
        use std::sync::atomic::Ordering::Relaxed;

        if let Some(value) = self.l1_lock().get(key) {
            self.counters.hits.fetch_add(1, Relaxed);
            self.counters.l1_hits.fetch_add(1, Relaxed);
            return Some(value);
        }
        self.counters.l1_misses.fetch_add(1, Relaxed);

        if self.l2.is_none() && self.l3.is_none() {
            self.counters.misses.fetch_add(1, Relaxed);
            return None;
        }

        let cell = {
            let entry = self
                .in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            entry.value().clone()
        };
        let value = cell
            .get_or_init(|| async { self.promote(key) })
            .await
            .clone();
        self.in_flight.remove(key);

        if value.is_some() {
            self.counters.hits.fetch_add(1, Relaxed);
        } else {
            self.counters.misses.fetch_add(1, Relaxed);
        }
        value
    }

    /// Probe L2 then L3; on hit, write-promote into every higher level.
    fn promote(&self, key: &str) -> Option<Value> {
        use std::sync::atomic::Ordering::Relaxed;

        if let Some(l2) = &self.l2 {
            match l2.get(key) {
                Ok(Some(value)) => {
                    self.counters.l2_hits.fetch_add(1, Relaxed);
                    self.l1_lock()
                        .insert(key.to_string(), value.clone(), self.default_ttl);
                    return Some(value);
                }
                Ok(None) => {
                    self.counters.l2_misses.fetch_add(1, Relaxed);
                }
                Err(e) => {
                    self.counters.l2_misses.fetch_add(1, Relaxed);
                    debug!(key = %key, error = %e, "L2 lookup failed");
                }
            }
        }

        if let Some(l3) = &self.l3 {
            match l3.get(key) {
                Ok(Some(value)) => {
                    self.counters.l3_hits.fetch_add(1, Relaxed);
                    if let Some(l2) = &self.l2 {
                        if let Err(e) = l2.set(key, &value, self.default_ttl) {
                            debug!(key = %key, error = %e, "L2 promotion failed");
                        }
                    }
                    self.l1_lock()
                        .insert(key.to_string(), value.clone(), self.default_ttl);
                    return Some(value);
                }
                Ok(None) => {
                    self.counters.l3_misses.fetch_add(1, Relaxed);
                }
                Err(e) => {
                    self.counters.l3_misses.fetch_add(1, Relaxed);
                    debug!(key = %key, error = %e, "L3 lookup failed");
                }
            }
        }

        None
    }

    /// Write-through: L1 immediately, lower levels on a blocking task.
    /// Lower-level failures are swallowed.
    pub async fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let key = key.into();
        let effective_ttl = ttl.or(self.default_ttl);
        self.l1_lock().insert(key.clone(), value.clone(), effective_ttl);

        let l2 = self.l2.clone();
        let l3 = self.l3.clone();
        if l2.is_some() || l3.is_some() {
            tokio::task::spawn_blocking(move || {
                if let Some(l2) = l2 {
                    if let Err(e) = l2.set(&key, &value, effective_ttl) {
                        debug!(key = %key, error = %e, "L2 write failed");
                    }
                }
                if let Some(l3) = l3 {
                    if let Err(e) = l3.set(&key, &value, effective_ttl) {
                        debug!(key = %key, error = %e, "L3 write failed");
                    }
                }
            });
        }
    }

    /// Delete from every level. Returns whether any level held the key.
    pub async fn delete(&self, key: &str) -> bool {
        let mut existed = self.l1_lock().delete(key);
        for level in [&self.l2, &self.l3].into_iter().flatten() {
            match level.delete(key) {
                Ok(found) => existed |= found,
                Err(e) => debug!(key = %key, level = level.name(), error = %e, "delete failed"),
            }
        }
        existed
    }

    /// Alias for `delete`, matching the invalidation surface.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.delete(key).await
    }

    /// Invalidate every key matching a glob or regex pattern across all
    /// levels. Returns the number of distinct keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> EngramResult<usize> {
        let regex = compile_pattern(pattern)?;

        let mut keys: HashSet<String> = self
            .l1_lock()
            .keys()
            .into_iter()
            .filter(|k| regex.is_match(k))
            .collect();
        for level in [&self.l2, &self.l3].into_iter().flatten() {
            if let Ok(level_keys) = level.keys() {
                keys.extend(level_keys.into_iter().filter(|k| regex.is_match(k)));
            }
        }

        for key in &keys {
            self.delete(key).await;
        }
        Ok(keys.len())
    }

    pub async fn has(&self, key: &str) -> bool {
        if self.l1_lock().has(key) {
            return true;
        }
        for level in [&self.l2, &self.l3].into_iter().flatten() {
            if level.has(key).unwrap_or(false) {
                return true;
            }
        }
        false
    }

    /// Clear every level.
    pub async fn clear(&self) {
        self.l1_lock().clear();
        for level in [&self.l2, &self.l3].into_iter().flatten() {
            if let Err(e) = level.clear() {
                debug!(level = level.name(), error = %e, "clear failed");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    /// Current L1 entry count.
    pub fn l1_size(&self) -> usize {
        self.l1_lock().len()
    }
}

/// Compile a glob-or-regex pattern. Patterns containing regex
/// metacharacters beyond `*`/`?` are treated as regular expressions;
/// anything else is treated as a glob.
fn compile_pattern(pattern: &str) -> EngramResult<Regex> {
    let is_regex = pattern
        .chars()
        .any(|c| matches!(c, '[' | ']' | '(' | ')' | '|' | '^' | '$' | '+' | '{' | '}' | '\\'));
    let source = if is_regex {
        pattern.to_string()
    } else {
        let mut out = String::with_capacity(pattern.len() + 8);
        out.push('^');
        for c in pattern.chars() {
            match c {
                '*' => out.push_str(".*"),
                '?' => out.push('.'),
                other => out.push_str(&regex::escape(&other.to_string())),
            }
        }
        out.push('$');
        out
    };
    Regex::new(&source)
        .map_err(|e| engram_core::EngramError::validation("pattern", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_patterns_compile() {
        let re = compile_pattern("memory:*").unwrap();
        assert!(re.is_match("memory:abc"));
        assert!(!re.is_match("session:abc"));

        let re = compile_pattern("event-?").unwrap();
        assert!(re.is_match("event-1"));
        assert!(!re.is_match("event-12"));
    }

    #[test]
    fn regex_patterns_pass_through() {
        let re = compile_pattern("^(a|b):\\d+$").unwrap();
        assert!(re.is_match("a:12"));
        assert!(re.is_match("b:7"));
        assert!(!re.is_match("c:7"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(compile_pattern("([unclosed").is_err());
    }
}
