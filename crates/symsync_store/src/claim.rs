//! Storage rows for rename claims.

use serde::{Deserialize, Serialize};
use symsync_protocol::{Symbol, SymbolKind};

/// One persisted rename claim.
///
/// Unlike the wire-level [`Symbol`], a claim always knows who made it and
/// when. Claims are immutable once written; a "deleted" rename is itself a
/// new claim with `name = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Display name of the author.
    pub author: String,
    /// Kind of the renamed item.
    pub kind: SymbolKind,
    /// Stable structural identifier of the item.
    pub canonical_signature: String,
    /// Claimed display name, or `None` for a reversion tombstone.
    pub name: Option<String>,
    /// Claim time, unix milliseconds.
    pub timestamp: i64,
}

impl Claim {
    /// Builds a claim from a wire symbol.
    ///
    /// Returns `None` if the symbol carries no author; a missing timestamp
    /// is stamped with `default_timestamp` (callers pass their clock).
    pub fn from_symbol(symbol: &Symbol, default_timestamp: i64) -> Option<Self> {
        let author = symbol.author.clone()?;
        Some(Self {
            author,
            kind: symbol.kind,
            canonical_signature: symbol.canonical_signature.clone(),
            name: symbol.name.clone(),
            timestamp: symbol.timestamp.unwrap_or(default_timestamp),
        })
    }

    /// Converts the claim back to a wire symbol.
    #[must_use]
    pub fn to_symbol(&self) -> Symbol {
        Symbol {
            kind: self.kind,
            canonical_signature: self.canonical_signature.clone(),
            name: self.name.clone(),
            timestamp: Some(self.timestamp),
            author: Some(self.author.clone()),
        }
    }

    /// The ledger primary key: `(author, signature, timestamp)`.
    #[must_use]
    pub fn key(&self) -> (String, String, i64) {
        (
            self.author.clone(),
            self.canonical_signature.clone(),
            self.timestamp,
        )
    }

    /// Returns true if this claim reverts the item to its original name.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.name.is_none()
    }
}
