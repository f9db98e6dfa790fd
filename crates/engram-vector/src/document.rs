//! Vector documents and component validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use engram_core::{EngramError, EngramResult};

/// A stored vector with its attached metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub vector: Vec<f32>,
    /// Flat metadata used by equality filters, e.g. `{id, workspace_id, …}`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorDocument {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Validate a vector's components against an optional fixed dimension.
pub fn validate_vector(id: &str, vector: &[f32], dimension: Option<usize>) -> EngramResult<()> {
    if vector.is_empty() {
        return Err(EngramError::validation(
            "vector",
            format!("empty vector for '{id}'"),
        ));
    }
    if vector.iter().any(|c| !c.is_finite()) {
        return Err(EngramError::validation(
            "vector",
            format!("non-finite component in vector for '{id}'"),
        ));
    }
    if let Some(expected) = dimension {
        if vector.len() != expected {
            return Err(EngramError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_vector_passes() {
        assert!(validate_vector("a", &[0.1, -0.5, 2.0], Some(3)).is_ok());
    }

    #[test]
    fn empty_vector_rejected() {
        assert!(validate_vector("a", &[], None).is_err());
    }

    #[test]
    fn nan_and_infinity_rejected() {
        assert!(validate_vector("a", &[0.1, f32::NAN], None).is_err());
        assert!(validate_vector("a", &[f32::INFINITY], None).is_err());
        assert!(validate_vector("a", &[f32::NEG_INFINITY], None).is_err());
    }

    #[test]
    fn dimension_mismatch_detected() {
        let err = validate_vector("a", &[1.0, 2.0], Some(3)).unwrap_err();
        assert!(matches!(
            err,
            EngramError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
