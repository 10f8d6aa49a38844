//! Error types for the sync server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket or listener I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] symsync_protocol::ProtocolError),

    /// A project's claim ledger failed.
    #[error("store error: {0}")]
    Store(#[from] symsync_store::StoreError),
}
