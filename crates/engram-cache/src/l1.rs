//! The in-process L1 tier: count-bounded map with LRU recency and
//! optional per-entry TTL, expire-on-read.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// One L1 entry. Recency is a monotonically increasing access tick.
#[derive(Debug, Clone)]
pub struct L1Entry {
    value: Value,
    expires_at: Option<Instant>,
    last_access: u64,
}

impl L1Entry {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }
}

/// Optional injected eviction policy: receives the current entry map and
/// returns the victim key. Falling back to LRU when it returns `None`.
pub type EvictionPolicy = dyn Fn(&HashMap<String, L1Entry>) -> Option<String> + Send + Sync;

pub(crate) struct L1Store {
    entries: HashMap<String, L1Entry>,
    max_entries: usize,
    tick: u64,
    policy: Option<Box<EvictionPolicy>>,
}

impl L1Store {
    pub fn new(max_entries: usize, policy: Option<Box<EvictionPolicy>>) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            tick: 0,
            policy,
        }
    }

    /// Lookup with expire-on-read and recency touch.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if self.entries.get(key).is_some_and(|e| e.is_expired()) {
            self.entries.remove(key);
            return None;
        }
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.last_access = tick;
            entry.value.clone()
        })
    }

    /// Insert, evicting one victim when at capacity.
    pub fn insert(&mut self, key: String, value: Value, ttl: Option<Duration>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_one();
        }
        self.tick += 1;
        self.entries.insert(
            key,
            L1Entry {
                value,
                expires_at: ttl.map(|d| Instant::now() + d),
                last_access: self.tick,
            },
        );
    }

    fn evict_one(&mut self) {
        // Injected policy has first refusal; default is least-recent tick.
        let victim = self
            .policy
            .as_ref()
            .and_then(|p| p(&self.entries))
            .or_else(|| {
                self.entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone())
            });
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn has(&mut self, key: &str) -> bool {
        if self.entries.get(key).is_some_and(|e| e.is_expired()) {
            self.entries.remove(key);
            return false;
        }
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
