//! # engram-index
//!
//! Durable authoritative store for event rows, session rows, git-state
//! rows, and the vector↔event mapping. Single writer, a rotating ring
//! of readers, WAL journaling, named migrations.

pub(crate) mod connection;
pub mod index;
pub mod migrations;
pub mod queries;
pub mod transaction;

pub use index::RelationalIndex;

use engram_core::EngramError;

/// Map a backend error message into the shared taxonomy.
pub(crate) fn to_index_err(message: impl Into<String>) -> EngramError {
    EngramError::StoreUnavailable {
        store: "relational index".to_string(),
        reason: message.into(),
    }
}

/// Map a rusqlite error, surfacing unique-key violations as `Conflict`.
pub(crate) fn from_sqlite_err(err: rusqlite::Error) -> EngramError {
    match err {
        rusqlite::Error::SqliteFailure(failure, detail)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            EngramError::Conflict {
                key: detail.unwrap_or_else(|| "unique constraint".to_string()),
            }
        }
        other => to_index_err(other.to_string()),
    }
}
