//! # symsync protocol
//!
//! Wire protocol types and framing for symsync.
//!
//! This crate provides:
//! - `Symbol` and `SymbolKind` for rename claims
//! - The `Command` catalog exchanged between client and server
//! - Length-prefixed framing (blocking and tokio flavors)
//! - The bare-name authentication handshake
//!
//! Apart from the framing helpers this is a pure protocol crate: it never
//! opens sockets or files itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod framing;
mod symbol;

/// Default TCP port of the broker.
pub const DEFAULT_PORT: u16 = 9501;

pub use command::Command;
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{
    encode_frame, read_frame, read_frame_async, read_handshake, read_handshake_async, write_frame,
    write_frame_async, write_handshake, write_handshake_async, MAX_FRAME_LEN,
};
pub use symbol::{project_id_for_content, unix_timestamp_millis, ProjectId, Symbol, SymbolKind};
