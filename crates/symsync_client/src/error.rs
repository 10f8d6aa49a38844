//! Error types for client workflows.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the sync workflows.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to or talking over the socket failed.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Framing or command encode/decode failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] symsync_protocol::ProtocolError),

    /// The rename engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] symsync_engine::EngineError),

    /// The connection is closed.
    #[error("connection is closed")]
    Closed,

    /// A connect spec string could not be parsed.
    #[error("invalid connect spec {0:?}, expected name@host[:port]")]
    InvalidSpec(String),
}

impl ClientError {
    /// Returns true if the error means the peer or socket went away, as
    /// opposed to a fault on a healthy connection.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ClientError::Closed => true,
            ClientError::Protocol(error) => error.is_disconnect(),
            ClientError::Connection(error) => matches!(
                error.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_classification() {
        assert!(ClientError::Closed.is_disconnect());

        let reset = ClientError::Connection(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(reset.is_disconnect());

        let bad_spec = ClientError::InvalidSpec("nonsense".into());
        assert!(!bad_spec.is_disconnect());
    }
}
