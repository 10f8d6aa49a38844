//! Error types for the rename engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during reconciliation.
///
/// A rejected apply (stale or missing target) is *not* an error: the
/// engine recovers with a compensating rollback and keeps going.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The client store for the project failed.
    #[error("store error: {0}")]
    Store(#[from] symsync_store::StoreError),

    /// A conflict evaluator returned a claim for a different signature
    /// than the one it was asked to resolve. This signals a broken policy
    /// extension and stops the flush.
    #[error("evaluator changed signature {expected:?} to {actual:?}")]
    EvaluatorInconsistency {
        /// Signature the evaluator was asked to resolve.
        expected: String,
        /// Signature of the claim it returned.
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistency_names_both_signatures() {
        let err = EngineError::EvaluatorInconsistency {
            expected: "sig_a".into(),
            actual: "sig_b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sig_a"));
        assert!(msg.contains("sig_b"));
    }
}
