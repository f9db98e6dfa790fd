//! # engram
//!
//! The system facade. Wires the subsystems into the two host-facing
//! flows: inject a context block for a prompt, and capture an
//! observation event. Every public operation passes admission control
//! and stamps the owning session.

pub mod facade;
pub mod responses;

pub use facade::Engram;
pub use responses::{CapturedEvent, ContextInjection};
