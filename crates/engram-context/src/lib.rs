//! # engram-context
//!
//! Turns a sequence of retrieved memories into a single size-bounded
//! text artifact: validate, dedupe by content similarity, rank by score,
//! render per event type, and truncate to the byte budget.

pub mod builder;
pub mod memory;
pub mod options;
pub mod render;
pub mod similarity;

pub use builder::{BuildStats, ContextBuilder};
pub use memory::RetrievedMemory;
pub use options::{ContextFormat, ContextOptions};
pub use render::{Renderer, RendererRegistry};
