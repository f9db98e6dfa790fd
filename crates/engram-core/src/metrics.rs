//! Resource snapshot types and the four-level pressure ladder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pressure levels in ascending severity. `Ord` gives the
/// NORMAL < WARNING < CRITICAL < EMERGENCY priority directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    #[default]
    Normal,
    Warning,
    Critical,
    Emergency,
}

/// Memory counters. After sanitization, `used + free == total` holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Fraction in [0, 1].
    pub utilization: f64,
}

impl MemoryMetrics {
    /// Build a snapshot from raw counters, repairing nonsensical values:
    /// total is at least 1, used/free are non-negative, and free is derived
    /// so that `used + free == total`.
    pub fn sanitized(total: u64, used: u64) -> Self {
        let total = total.max(1);
        let used = used.min(total);
        let free = total - used;
        let utilization = (used as f64 / total as f64).clamp(0.0, 1.0);
        Self {
            total,
            used,
            free,
            utilization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub cores: usize,
    /// Fraction in [0, 1].
    pub utilization: f64,
    /// 1, 5 and 15 minute load averages.
    pub load_avg: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub pid: u32,
    pub rss: u64,
    pub heap_used: u64,
    pub heap_total: u64,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub utilization: f64,
}

/// One sampled snapshot. Appended to a bounded ring by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub timestamp: DateTime<Utc>,
    pub memory: MemoryMetrics,
    pub cpu: CpuMetrics,
    pub process: ProcessMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskMetrics>,
}
