//! # engram-monitor
//!
//! Samples system and process counters on an interval, derives four-level
//! pressure per resource, and fires registered cleanup handlers when the
//! overall level reaches EMERGENCY.

pub mod collector;
pub mod monitor;
pub mod pressure;
pub mod validation;

pub use monitor::{CleanupHandler, PerfCounters, ResourceMonitor};
pub use pressure::PressureAnalysis;
pub use validation::validate_config;
