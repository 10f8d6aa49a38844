//! # symsync engine
//!
//! Client-side rename reconciliation for symsync.
//!
//! This crate provides:
//! - The [`HostModel`] seam a decompiler adapter implements
//! - [`ConflictEvaluator`] strategies, with max-timestamp as the default
//! - [`RenameEngine`] - mirrors remote claims, resolves the winning claim
//!   per signature, applies winners to the local model and tracks pending
//!   ("dirty") work
//!
//! The engine never talks to the network; the sync workflows compose it
//! with a connection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod evaluator;
mod model;

pub use engine::{ApplyState, RenameEngine, LAST_SYNC_KEY};
pub use error::{EngineError, EngineResult};
pub use evaluator::{ConflictEvaluator, MaxTimestamp};
pub use model::{HostModel, MemoryModel, ModelItem};
