//! # symsync server
//!
//! Central rename broker for symsync.
//!
//! The server accepts TCP connections, authenticates each by a
//! self-declared display name (the bare first frame), tracks per-project
//! subscriptions, persists incoming claims into per-project ledgers and
//! fans them out to every other subscriber of the project.
//!
//! # Architecture
//!
//! One tokio task per connection runs the decode/dispatch loop; a second
//! task per connection drains that session's outbox channel onto the
//! socket. Shared state (the session registry and the store registry)
//! sits behind short-held locks that are never kept across I/O. Upload
//! handling is serialized per project, so subscribers observe updates in
//! the order the originating uploads were processed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod server;
mod sessions;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::{ServerError, ServerResult};
pub use server::SymbolServer;
