//! Monitor config validation, rejected at construction.

use engram_core::config::monitor_config::{MonitorConfig, ThresholdBand};
use engram_core::{EngramError, EngramResult};

/// Validate thresholds and interval. Every resource band must be present,
/// each value inside [0, 1], strictly ordered warning < critical <
/// emergency, and the interval must not be negative.
pub fn validate_config(config: &MonitorConfig) -> EngramResult<()> {
    if config.monitoring_interval_ms < 0 {
        return Err(EngramError::validation(
            "monitoring_interval",
            format!("must not be negative, got {}", config.monitoring_interval_ms),
        ));
    }

    let bands = [
        ("memory", config.thresholds.memory),
        ("cpu", config.thresholds.cpu),
        ("disk", config.thresholds.disk),
        ("file_descriptors", config.thresholds.file_descriptors),
    ];
    for (resource, band) in bands {
        let Some(band) = band else {
            return Err(EngramError::validation(
                "thresholds",
                format!("missing band for {resource}"),
            ));
        };
        validate_band(resource, &band)?;
    }
    Ok(())
}

fn validate_band(resource: &str, band: &ThresholdBand) -> EngramResult<()> {
    for (name, value) in [
        ("warning", band.warning),
        ("critical", band.critical),
        ("emergency", band.emergency),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(EngramError::validation(
                "thresholds",
                format!("{resource}.{name} must be in [0, 1], got {value}"),
            ));
        }
    }
    if !(band.warning < band.critical && band.critical < band.emergency) {
        return Err(EngramError::validation(
            "thresholds",
            format!("{resource} bands must satisfy warning < critical < emergency"),
        ));
    }
    Ok(())
}
