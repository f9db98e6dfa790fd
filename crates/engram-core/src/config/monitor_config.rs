use serde::{Deserialize, Serialize};

use super::defaults;

/// Per-resource pressure thresholds. Must satisfy
/// `0 ≤ warning < critical < emergency ≤ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub warning: f64,
    pub critical: f64,
    pub emergency: f64,
}

impl ThresholdBand {
    pub const fn new(warning: f64, critical: f64, emergency: f64) -> Self {
        Self {
            warning,
            critical,
            emergency,
        }
    }
}

/// Threshold bands per monitored resource. All four are required; a band
/// left as `None` fails monitor construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub memory: Option<ThresholdBand>,
    pub cpu: Option<ThresholdBand>,
    pub disk: Option<ThresholdBand>,
    pub file_descriptors: Option<ThresholdBand>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memory: Some(ThresholdBand::new(0.70, 0.90, 0.95)),
            cpu: Some(ThresholdBand::new(0.70, 0.85, 0.95)),
            disk: Some(ThresholdBand::new(0.80, 0.90, 0.95)),
            file_descriptors: Some(ThresholdBand::new(0.70, 0.85, 0.95)),
        }
    }
}

/// Resource monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between samples (milliseconds). Negative values are
    /// rejected at construction.
    pub monitoring_interval_ms: i64,
    /// Ring buffer capacity for retained snapshots.
    pub history_size: usize,
    pub thresholds: Thresholds,
    /// When true, EMERGENCY pressure invokes registered cleanup handlers.
    pub emergency_cleanup: bool,
    /// Minimum spacing between emergency alerts (milliseconds).
    pub alert_cooldown_ms: u64,
    /// Lightweight path: skips per-cpu refresh and disk sampling.
    pub simple_mode: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitoring_interval_ms: defaults::DEFAULT_MONITOR_INTERVAL_MS,
            history_size: defaults::DEFAULT_MONITOR_HISTORY_SIZE,
            thresholds: Thresholds::default(),
            emergency_cleanup: true,
            alert_cooldown_ms: defaults::DEFAULT_ALERT_COOLDOWN_MS,
            simple_mode: false,
        }
    }
}
