//! # symsync store
//!
//! Durable claim ledgers for symsync.
//!
//! This crate provides:
//! - [`SymbolStore`] - the server's append-only per-project claim ledger
//! - [`StoreRegistry`] - lazy per-project store cache
//! - [`ClientStore`] - the client-side claim mirror, rename records and
//!   metadata
//!
//! All three persist through the same record log format: an append-only
//! file of CRC-protected CBOR records that is replayed into memory on open.
//! A torn tail (from a crash mid-append) is truncated during replay, so a
//! reopened ledger always ends on a record boundary.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod claim;
mod client;
mod error;
mod log;
mod registry;
mod store;

pub use claim::Claim;
pub use client::{ClientStore, RenameRecord};
pub use error::{StoreError, StoreResult};
pub use registry::StoreRegistry;
pub use store::SymbolStore;
