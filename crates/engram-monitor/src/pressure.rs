//! The four-level pressure ladder.

use engram_core::config::monitor_config::{MonitorConfig, ThresholdBand};
use engram_core::{PressureLevel, ResourceMetrics};

/// Per-resource levels plus the overall maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureAnalysis {
    pub overall: PressureLevel,
    pub memory: PressureLevel,
    pub cpu: PressureLevel,
    pub disk: PressureLevel,
    pub file_descriptors: PressureLevel,
    pub metrics: ResourceMetrics,
}

/// Map a utilization fraction onto a band.
pub fn level_for(utilization: f64, band: &ThresholdBand) -> PressureLevel {
    if utilization >= band.emergency {
        PressureLevel::Emergency
    } else if utilization >= band.critical {
        PressureLevel::Critical
    } else if utilization >= band.warning {
        PressureLevel::Warning
    } else {
        PressureLevel::Normal
    }
}

/// Analyze one snapshot against the configured thresholds. Resources
/// without a sample (disk, file descriptors) stay NORMAL; the overall
/// level is the pointwise maximum.
pub fn analyze(metrics: &ResourceMetrics, config: &MonitorConfig) -> PressureAnalysis {
    let memory = config
        .thresholds
        .memory
        .map(|band| level_for(metrics.memory.utilization, &band))
        .unwrap_or_default();
    let cpu = config
        .thresholds
        .cpu
        .map(|band| level_for(metrics.cpu.utilization, &band))
        .unwrap_or_default();
    let disk = match (&metrics.disk, config.thresholds.disk) {
        (Some(disk), Some(band)) => level_for(disk.utilization, &band),
        _ => PressureLevel::Normal,
    };
    let file_descriptors = PressureLevel::Normal;

    let overall = [memory, cpu, disk, file_descriptors]
        .into_iter()
        .max()
        .unwrap_or_default();

    PressureAnalysis {
        overall,
        memory,
        cpu,
        disk,
        file_descriptors,
        metrics: metrics.clone(),
    }
}
