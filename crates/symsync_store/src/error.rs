//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while operating a claim ledger.
///
/// Store failures are scoped: an error from one project's ledger never
/// affects another project's.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred on the backing file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode a record payload.
    #[error("encode error: {0}")]
    Encode(String),

    /// A replayed record payload could not be decoded.
    #[error("corrupted ledger: {0}")]
    Corrupted(String),

    /// The project id cannot be mapped to a ledger file.
    #[error("invalid project id: {0:?}")]
    InvalidProject(String),
}
