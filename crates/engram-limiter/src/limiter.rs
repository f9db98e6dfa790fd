//! The rate limiter. Window state lives in a DashMap keyed by the
//! namespaced key; nothing is persisted across restarts.

use std::collections::VecDeque;

use chrono::Utc;
use dashmap::DashMap;

use engram_core::config::{LimiterConfig, WindowStrategy};
use engram_core::{EngramError, EngramResult};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Milliseconds until the window resets.
    pub reset_after_ms: u64,
    pub limit: u64,
    /// Seconds to wait before retrying; only set on deny.
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Default)]
struct KeyState {
    /// Request instants inside the sliding window.
    timestamps: VecDeque<i64>,
    /// Epoch-aligned bucket index (fixed window).
    bucket: i64,
    /// Count inside the current bucket (fixed window).
    bucket_count: u64,
    last_access: i64,
}

/// Per-key sliding/fixed window rate limiter.
pub struct RateLimiter {
    config: LimiterConfig,
    keys: DashMap<String, KeyState>,
}

impl RateLimiter {
    /// Construct; rejects non-positive `max_requests` or `window_ms`.
    pub fn new(config: LimiterConfig) -> EngramResult<Self> {
        if config.max_requests <= 0 {
            return Err(EngramError::validation(
                "max_requests",
                format!("must be positive, got {}", config.max_requests),
            ));
        }
        if config.window_ms <= 0 {
            return Err(EngramError::validation(
                "window_ms",
                format!("must be positive, got {}", config.window_ms),
            ));
        }
        Ok(Self {
            config,
            keys: DashMap::new(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.config.key_prefix)
    }

    /// Check and consume one slot for a key.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now().timestamp_millis())
    }

    /// Deterministic variant taking the clock as a parameter.
    pub fn check_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let full_key = self.namespaced(key);
        let mut state = self.keys.entry(full_key).or_default();
        state.last_access = now_ms;
        match self.config.strategy {
            WindowStrategy::Sliding => self.sliding_check(&mut state, now_ms),
            WindowStrategy::Fixed => self.fixed_check(&mut state, now_ms),
        }
    }

    /// Observe the current state without consuming a slot.
    pub fn get_state(&self, key: &str) -> RateLimitDecision {
        self.get_state_at(key, Utc::now().timestamp_millis())
    }

    /// Deterministic variant of `get_state`. Never mutates key state.
    pub fn get_state_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let window = self.config.window_ms;
        let max = self.config.max_requests as u64;
        let full_key = self.namespaced(key);

        let Some(state) = self.keys.get(&full_key) else {
            return RateLimitDecision {
                allowed: true,
                remaining: max,
                reset_after_ms: window as u64,
                limit: max,
                retry_after_secs: None,
            };
        };

        let (count, reset_after_ms) = match self.config.strategy {
            WindowStrategy::Sliding => {
                let floor = now_ms - window;
                let count = state.timestamps.iter().filter(|&&t| t >= floor).count() as u64;
                let reset = state
                    .timestamps
                    .iter()
                    .find(|&&t| t >= floor)
                    .map(|&oldest| (oldest + window - now_ms).max(0) as u64)
                    .unwrap_or(window as u64);
                (count, reset)
            }
            WindowStrategy::Fixed => {
                let bucket = now_ms.div_euclid(window);
                let count = if state.bucket == bucket {
                    state.bucket_count
                } else {
                    0
                };
                (count, ((bucket + 1) * window - now_ms).max(0) as u64)
            }
        };

        if count < max {
            RateLimitDecision {
                allowed: true,
                remaining: max - count,
                reset_after_ms,
                limit: max,
                retry_after_secs: None,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_after_ms,
                limit: max,
                retry_after_secs: Some(reset_after_ms.div_ceil(1_000)),
            }
        }
    }

    fn sliding_check(&self, state: &mut KeyState, now_ms: i64) -> RateLimitDecision {
        let window = self.config.window_ms;
        let max = self.config.max_requests as u64;

        // Retain timestamps within [now - window, now].
        while state
            .timestamps
            .front()
            .is_some_and(|&t| t < now_ms - window)
        {
            state.timestamps.pop_front();
        }

        let count = state.timestamps.len() as u64;
        let reset_after_ms = state
            .timestamps
            .front()
            .map(|&oldest| (oldest + window - now_ms).max(0) as u64)
            .unwrap_or(window as u64);

        if count < max {
            state.timestamps.push_back(now_ms);
            RateLimitDecision {
                allowed: true,
                remaining: max - (count + 1),
                reset_after_ms,
                limit: max,
                retry_after_secs: None,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_after_ms,
                limit: max,
                retry_after_secs: Some(reset_after_ms.div_ceil(1_000)),
            }
        }
    }

    fn fixed_check(&self, state: &mut KeyState, now_ms: i64) -> RateLimitDecision {
        let window = self.config.window_ms;
        let max = self.config.max_requests as u64;

        let bucket = now_ms.div_euclid(window);
        if state.bucket != bucket {
            state.bucket = bucket;
            state.bucket_count = 0;
        }
        let reset_after_ms = ((bucket + 1) * window - now_ms).max(0) as u64;

        if state.bucket_count < max {
            state.bucket_count += 1;
            RateLimitDecision {
                allowed: true,
                remaining: max - state.bucket_count,
                reset_after_ms,
                limit: max,
                retry_after_secs: None,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_after_ms,
                limit: max,
                retry_after_secs: Some(reset_after_ms.div_ceil(1_000)),
            }
        }
    }

    /// Forget a key's window state.
    pub fn reset(&self, key: &str) {
        self.keys.remove(&self.namespaced(key));
    }

    /// Evict keys idle beyond the configured ttl. Returns the count.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now().timestamp_millis())
    }

    /// Deterministic variant of `cleanup`.
    pub fn cleanup_at(&self, now_ms: i64) -> usize {
        let ttl = self.config.ttl_ms as i64;
        let before = self.keys.len();
        self.keys.retain(|_, state| now_ms - state.last_access <= ttl);
        before - self.keys.len()
    }

    /// Drop all window state.
    pub fn clear(&self) {
        self.keys.clear();
    }

    /// Number of tracked keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: i64, window: i64, strategy: WindowStrategy) -> LimiterConfig {
        LimiterConfig {
            max_requests: max,
            window_ms: window,
            strategy,
            key_prefix: String::new(),
            ttl_ms: 10_000,
        }
    }

    #[test]
    fn constructor_rejects_bad_limits() {
        assert!(RateLimiter::new(config(0, 1_000, WindowStrategy::Sliding)).is_err());
        assert!(RateLimiter::new(config(5, 0, WindowStrategy::Fixed)).is_err());
        assert!(RateLimiter::new(config(-1, 1_000, WindowStrategy::Sliding)).is_err());
    }

    #[test]
    fn sliding_window_allows_then_denies() {
        let limiter = RateLimiter::new(config(5, 1_000, WindowStrategy::Sliding)).unwrap();
        for t in 0..5 {
            let decision = limiter.check_at("k", t);
            assert!(decision.allowed, "call at t={t} should pass");
            assert_eq!(decision.remaining, 4 - t as u64);
        }
        let denied = limiter.check_at("k", 5);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs, Some(1));
    }

    #[test]
    fn sliding_window_frees_slots_as_time_passes() {
        let limiter = RateLimiter::new(config(2, 100, WindowStrategy::Sliding)).unwrap();
        assert!(limiter.check_at("k", 0).allowed);
        assert!(limiter.check_at("k", 10).allowed);
        assert!(!limiter.check_at("k", 50).allowed);
        // The t=0 slot has left the window.
        assert!(limiter.check_at("k", 101).allowed);
    }

    #[test]
    fn fixed_window_resets_on_bucket_boundary() {
        let limiter = RateLimiter::new(config(3, 1_000, WindowStrategy::Fixed)).unwrap();
        for t in [0, 100, 200] {
            assert!(limiter.check_at("k", t).allowed);
        }
        let denied = limiter.check_at("k", 900);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, Some(1));

        // Next epoch-aligned bucket.
        assert!(limiter.check_at("k", 1_000).allowed);
    }

    #[test]
    fn get_state_does_not_consume() {
        let limiter = RateLimiter::new(config(2, 1_000, WindowStrategy::Sliding)).unwrap();
        limiter.check_at("k", 0);
        let state = limiter.get_state_at("k", 1);
        assert!(state.allowed);
        assert_eq!(state.remaining, 1);
        // Still one slot left after observing.
        assert!(limiter.check_at("k", 2).allowed);
        assert!(!limiter.check_at("k", 3).allowed);
    }

    #[test]
    fn keys_are_independent_and_namespaced() {
        let mut cfg = config(1, 1_000, WindowStrategy::Sliding);
        cfg.key_prefix = "rpc:".to_string();
        let limiter = RateLimiter::new(cfg).unwrap();
        assert!(limiter.check_at("a", 0).allowed);
        assert!(limiter.check_at("b", 0).allowed);
        assert!(!limiter.check_at("a", 1).allowed);
    }

    #[test]
    fn reset_and_clear_forget_state() {
        let limiter = RateLimiter::new(config(1, 1_000, WindowStrategy::Sliding)).unwrap();
        limiter.check_at("k", 0);
        assert!(!limiter.check_at("k", 1).allowed);
        limiter.reset("k");
        assert!(limiter.check_at("k", 2).allowed);

        limiter.clear();
        assert_eq!(limiter.key_count(), 0);
    }

    #[test]
    fn cleanup_evicts_idle_keys() {
        let limiter = RateLimiter::new(config(5, 1_000, WindowStrategy::Sliding)).unwrap();
        limiter.check_at("old", 0);
        limiter.check_at("fresh", 9_500);
        // ttl is 10_000ms; "old" was last seen at t=0.
        let evicted = limiter.cleanup_at(11_000);
        assert_eq!(evicted, 1);
        assert_eq!(limiter.key_count(), 1);
    }

    #[test]
    fn unknown_key_state_is_fully_open() {
        let limiter = RateLimiter::new(config(7, 500, WindowStrategy::Sliding)).unwrap();
        let state = limiter.get_state("never-seen");
        assert!(state.allowed);
        assert_eq!(state.remaining, 7);
        assert_eq!(state.limit, 7);
    }
}
