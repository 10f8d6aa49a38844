//! Error types for protocol encoding and framing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding or framing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame header announced more bytes than the protocol allows.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Announced payload length.
        len: usize,
        /// Maximum accepted payload length.
        max: usize,
    },

    /// Failed to encode a message.
    #[error("encode error: {0}")]
    Encode(String),

    /// Failed to decode a message. Unrecognized command tags land here.
    #[error("decode error: {0}")]
    Decode(String),

    /// The handshake frame was not valid UTF-8.
    #[error("handshake is not valid utf-8: {0}")]
    InvalidHandshake(#[from] std::string::FromUtf8Error),
}

impl ProtocolError {
    /// Returns true if the error indicates the peer went away, as opposed
    /// to a malformed frame on a healthy stream.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
