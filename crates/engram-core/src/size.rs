//! Human-readable size parsing: `N`, `N KB`, `N MB`, `N GB`.

use crate::errors::{EngramError, EngramResult};

/// Parse a size string into bytes. Units are case-insensitive binary
/// multiples; fractional values are not supported.
pub fn parse_size(input: &str) -> EngramResult<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EngramError::validation("size", "empty size string"));
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: usize = digits
        .parse()
        .map_err(|_| EngramError::validation("size", format!("invalid number in '{input}'")))?;

    let multiplier: usize = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        other => {
            return Err(EngramError::validation(
                "size",
                format!("unknown unit '{other}'"),
            ))
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| EngramError::validation("size", format!("size overflow in '{input}'")))
}
