//! # engram-cache
//!
//! Read-through / write-through three-tier cache. L1 is in-process with
//! LRU eviction and optional per-entry TTL; L2 and L3 are pluggable
//! behind the `CacheLevel` capability set. Concurrent misses on the same
//! key share one promotion via single-flight.

pub mod cache;
pub mod l1;
pub mod level;
pub mod levels;
pub mod stats;

pub use cache::MultiLevelCache;
pub use l1::{EvictionPolicy, L1Entry};
pub use level::CacheLevel;
pub use levels::moka_level::MokaLevel;
pub use levels::sqlite_level::SqliteLevel;
pub use stats::CacheStats;
