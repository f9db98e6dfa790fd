//! # engram-core
//!
//! Foundation crate for the Engram memory system.
//! Defines the event model, error taxonomy, config, constants, and the
//! sanitization helpers shared by every other crate in the workspace.

pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod filters;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod sanitize;
pub mod session;
pub mod size;
pub mod validate;

// Re-export the most commonly used types at the crate root.
pub use config::EngramConfig;
pub use errors::{EngramError, EngramResult};
pub use event::{Event, EventType, NewEvent};
pub use filters::{OrderBy, OrderDirection, QueryFilters};
pub use metrics::{PressureLevel, ResourceMetrics};
pub use session::Session;
