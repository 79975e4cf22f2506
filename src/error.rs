//! Error types.
//!
//! Almost everything in this crate is total. The exceptions are analyzer
//! requests that race with edits and the one-time semantic token legend check.

use thiserror::Error;

use crate::base::DocumentId;

/// Outcome of a versioned request to the external analyzer that produced no
/// usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The document changed while the analyzer was working; the response
    /// refers to text that no longer exists. Retry.
    #[error("{file} changed during analysis (requested at version {requested}, now {current})")]
    Busy {
        file: DocumentId,
        requested: u64,
        current: u64,
    },

    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("request cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Whether the caller should retry rather than report "nothing here".
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

/// A semantic token table that does not cover every classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegendError {
    #[error("token type legend has {populated} entries, expected {declared}")]
    TokenTypes { populated: usize, declared: usize },

    #[error("token modifier legend has {populated} entries, expected {declared}")]
    TokenModifiers { populated: usize, declared: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_is_distinguishable() {
        let busy = AnalysisError::Busy {
            file: DocumentId::new(3),
            requested: 1,
            current: 2,
        };
        assert!(busy.is_busy());
        assert!(!AnalysisError::Cancelled.is_busy());
        assert_eq!(
            busy.to_string(),
            "doc#3 changed during analysis (requested at version 1, now 2)"
        );
    }
}
