//! # symsync client
//!
//! Sync workflows for symsync clients.
//!
//! This crate composes the rename engine with a [`Connection`] to the
//! broker:
//! - [`SyncToServer`] - one-shot startup upload of unsynced local renames
//! - [`RenameListener`] - event-driven upload of individual user renames,
//!   with echo suppression
//! - [`ScanUpdatedSymbols`] - periodic reconciliation that also detects
//!   reverted symbols by diffing
//! - [`UpdateListener`] - continuous download and application of remote
//!   claims, plus the [`announce`] session bring-up
//!
//! The workflows are blocking and thread-friendly: a host adapter runs the
//! update listener on its own thread and calls the uploaders from its
//! event callbacks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod rename_listener;
mod scan_updated_symbols;
mod spec;
mod sync_to_server;
mod update_listener;

pub use connection::{Connection, MockConnection, TcpConnection};
pub use error::{ClientError, ClientResult};
pub use rename_listener::RenameListener;
pub use scan_updated_symbols::ScanUpdatedSymbols;
pub use spec::ConnectSpec;
pub use sync_to_server::SyncToServer;
pub use update_listener::{announce, UpdateListener};
