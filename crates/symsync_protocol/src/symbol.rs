//! Symbol data model shared by every symsync component.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Identifier of a synchronization scope, one per analyzed binary.
pub type ProjectId = String;

/// The kind of renameable item a claim refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    /// A field of a class.
    Field,
    /// A method, including constructors.
    Method,
    /// A class or type.
    Class,
}

impl SymbolKind {
    /// Converts the kind to its wire code.
    #[must_use]
    pub const fn as_code(self) -> u8 {
        match self {
            SymbolKind::Field => 0,
            SymbolKind::Method => 1,
            SymbolKind::Class => 2,
        }
    }

    /// Converts a wire code to a kind.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SymbolKind::Field),
            1 => Some(SymbolKind::Method),
            2 => Some(SymbolKind::Class),
            _ => None,
        }
    }
}

impl Serialize for SymbolKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_code())
    }
}

impl<'de> Deserialize<'de> for SymbolKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        SymbolKind::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown symbol kind code {code}")))
    }
}

/// One assertion about the display name of a renameable item.
///
/// `canonical_signature` is a stable structural identifier derived from the
/// binary's original layout; it never changes when the item is renamed.
/// `name = None` is a tombstone: the item was reverted to its original name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Kind of the renamed item.
    pub kind: SymbolKind,
    /// Stable structural identifier of the item.
    pub canonical_signature: String,
    /// Claimed display name, or `None` for a reversion.
    pub name: Option<String>,
    /// Claim time in unix milliseconds, if stamped yet.
    pub timestamp: Option<i64>,
    /// Display name of the claim's author, if stamped yet.
    pub author: Option<String>,
}

impl Symbol {
    /// Creates an unstamped symbol.
    pub fn new(kind: SymbolKind, canonical_signature: impl Into<String>) -> Self {
        Self {
            kind,
            canonical_signature: canonical_signature.into(),
            name: None,
            timestamp: None,
            author: None,
        }
    }

    /// Returns the symbol with the given name claim.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the symbol with the given timestamp.
    #[must_use]
    pub fn timestamped(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns the symbol attributed to the given author.
    #[must_use]
    pub fn authored(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Returns true if this claim reverts the item to its original name.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.name.is_none()
    }
}

/// Returns the current unix time in milliseconds.
///
/// Claims carry wall-clock timestamps from many machines; millisecond
/// resolution keeps accidental ties rare without assuming synchronized
/// clocks.
pub fn unix_timestamp_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

/// Derives the project id for an analyzed binary from its content.
///
/// Every collaborator loading the same bytes ends up in the same project,
/// independent of file name or local path.
pub fn project_id_for_content(content: &[u8]) -> ProjectId {
    let digest = Sha256::digest(content);
    let mut id = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(id, "{byte:02x}");
    }
    id
}
