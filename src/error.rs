//! Error types for motif synthesis.

use thiserror::Error;

/// Result type alias for motifgen operations
pub type Result<T> = std::result::Result<T, MotifError>;

/// Error type for motifgen operations
///
/// Forbidden bases, dead ends and failed batches are ordinary values, not
/// errors. Only configuration and parsing problems end up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotifError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// A character outside the nucleotide alphabet
    #[error("Invalid nucleotide '{symbol}' (expected one of A, T, C, G)")]
    InvalidNucleotide {
        /// The offending character
        symbol: char,
    },

    /// Unknown constraint or hyperparameter name
    #[error("Unknown constraint '{name}' (expected hom, hairpin, gcContent, similarity or noKeyInPayload)")]
    UnknownConstraint {
        /// The name that failed to parse
        name: String,
    },
}

impl MotifError {
    pub(crate) fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        MotifError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}
