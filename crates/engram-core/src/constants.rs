/// Engram system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default cap on a serialized event, overridable via config.
pub const DEFAULT_MAX_MEMORY_SIZE: &str = "1 MB";

/// Content larger than this spills a copy into the blob store.
pub const BLOB_SPILL_THRESHOLD: usize = 10 * 1024;

/// Content must exceed this many characters to be embeddable.
pub const EMBEDDABLE_MIN_CONTENT_CHARS: usize = 50;

/// Prompts longer than this are rejected at the boundary.
pub const MAX_PROMPT_CHARS: usize = 100_000;

/// Number of content characters copied into vector metadata.
pub const CONTENT_PREFIX_CHARS: usize = 100;

/// Strings in logs and sanitized metadata are truncated past this.
pub const MAX_LOGGED_STRING_BYTES: usize = 500;

/// Depth cap for metadata sanitization recursion.
pub const MAX_SANITIZE_DEPTH: usize = 32;
