//! # engram-vector
//!
//! Nearest-neighbor index over high-dimensional float vectors with
//! metadata filters, batch mutation, and crash-safe on-disk persistence.
//! Dimension is fixed at the first insertion; vectors with NaN or ±∞
//! components are rejected.

pub mod document;
pub mod index;
pub mod persistence;
pub mod scoring;

pub use document::VectorDocument;
pub use index::{
    BatchAddResult, BatchError, DeleteBatchResult, SearchOptions, SearchResult, UpsertResult,
    VectorIndex, VectorIndexConfig,
};

use engram_core::EngramError;

pub(crate) fn to_vector_err(message: impl Into<String>) -> EngramError {
    EngramError::StoreUnavailable {
        store: "vector index".to_string(),
        reason: message.into(),
    }
}
