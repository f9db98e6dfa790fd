//! # engram-storage
//!
//! The single facade over the relational index, the vector index, and
//! the blob store. A successful `capture` leaves the stores mutually
//! consistent: the relational row is authoritative, vector and blob
//! writes are best-effort side effects.

pub mod blob;
pub mod engine;

pub use blob::BlobStore;
pub use engine::{Embedder, StorageEngine};
