//! # engram-limiter
//!
//! Per-key admission control with sliding or fixed windows. No I/O;
//! every operation is O(per-key timestamp count).

pub mod limiter;

pub use limiter::{RateLimitDecision, RateLimiter};
