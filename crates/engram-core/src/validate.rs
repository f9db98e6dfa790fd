//! Boundary validation helpers shared by the engine and the RPC layer.

use crate::constants::MAX_PROMPT_CHARS;
use crate::errors::{EngramError, EngramResult};

/// Validate a user prompt at the ingress boundary.
pub fn validate_prompt(prompt: &str) -> EngramResult<()> {
    if prompt.trim().is_empty() {
        return Err(EngramError::validation("prompt", "EMPTY_PROMPT"));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(EngramError::validation("prompt", "PROMPT_TOO_LARGE"));
    }
    Ok(())
}
