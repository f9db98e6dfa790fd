//! Error taxonomy shared across the workspace.
//!
//! Validation and SizeLimit are reported to callers verbatim. Side-write
//! failures (vector, blob) are logged and swallowed by the storage engine;
//! only the authoritative relational write aborts a capture.

/// Result alias used throughout the workspace.
pub type EngramResult<T> = Result<T, EngramError>;

/// All error kinds the public surface can produce.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    SizeLimit { size: usize, max: usize },

    #[error("operation invoked before initialization")]
    NotInitialized,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{store} unavailable: {reason}")]
    StoreUnavailable { store: String, reason: String },

    #[error("conflict on unique key: {key}")]
    Conflict { key: String },

    #[error("{operation} timed out after {ms}ms")]
    Timeout { operation: String, ms: u64 },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("operation invoked after close")]
    Closed,

    #[error("internal invariant broken: {reason}")]
    Internal { reason: String },
}

impl EngramError {
    /// Shorthand for a validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a backing-store failure.
    pub fn store(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an internal invariant violation.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Whether this error should trigger the process restart policy.
    ///
    /// Matches the classifier inherited from the source system: failures
    /// mentioning initialization or corruption are unrecoverable in-process.
    pub fn is_critical(&self) -> bool {
        let msg = self.to_string();
        msg.contains("initialization") || msg.contains("corrupt") || msg.contains("SQLITE_CORRUPT")
    }

    /// Stable machine-readable code for the CLI/RPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION",
            Self::SizeLimit { .. } => "SIZE_LIMIT",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::Conflict { .. } => "CONFLICT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Closed => "CLOSED",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}
