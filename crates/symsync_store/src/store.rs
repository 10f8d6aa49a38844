//! The server-side per-project claim ledger.

use crate::claim::Claim;
use crate::error::{StoreError, StoreResult};
use crate::log::RecordLog;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Durable, append-only ledger of every claim ever made for one project.
///
/// The full history is retained; queries answer in terms of "latest":
/// either latest per `(signature, author)` pair ([`SymbolStore::get`]) or
/// latest per signature across all authors ([`SymbolStore::get_latest`],
/// the authoritative view used for full sync).
pub struct SymbolStore {
    log: RecordLog,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    /// Primary keys already present, for idempotent retransmission.
    seen: HashSet<(String, String, i64)>,
    /// Latest claim per `(signature, author)`, with insertion sequence.
    latest: HashMap<(String, String), IndexedClaim>,
}

struct IndexedClaim {
    claim: Claim,
    seq: u64,
}

impl StoreState {
    /// Admits a claim into the in-memory index. Returns false for a
    /// duplicate primary key.
    fn admit(&mut self, claim: Claim) -> bool {
        if !self.seen.insert(claim.key()) {
            return false;
        }

        let seq = self.seen.len() as u64;
        let key = (claim.canonical_signature.clone(), claim.author.clone());
        match self.latest.get(&key) {
            Some(current) if current.claim.timestamp > claim.timestamp => {}
            _ => {
                self.latest.insert(key, IndexedClaim { claim, seq });
            }
        }
        true
    }
}

impl SymbolStore {
    /// Opens or creates the ledger at `path`, replaying its history.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let (log, payloads) = RecordLog::open(path, true)?;

        let mut state = StoreState::default();
        for payload in payloads {
            let claim: Claim = ciborium::de::from_reader(payload.as_slice())
                .map_err(|e| StoreError::Corrupted(e.to_string()))?;
            state.admit(claim);
        }

        Ok(Self {
            log,
            state: Mutex::new(state),
        })
    }

    /// Appends a batch of claims.
    ///
    /// The append is idempotent: a claim whose `(author, signature,
    /// timestamp)` key is already in the ledger is skipped without error,
    /// so retransmission after a partial failure is safe. Returns the
    /// number of claims actually appended.
    pub fn push(&self, claims: &[Claim]) -> StoreResult<usize> {
        let mut appended = 0;
        let mut state = self.state.lock();
        for claim in claims {
            if !state.admit(claim.clone()) {
                continue;
            }
            let mut payload = Vec::new();
            ciborium::ser::into_writer(claim, &mut payload)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            self.log.append(&payload)?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Returns the latest claim for each matching `(signature, author)`
    /// pair, optionally filtered by signature and/or author.
    pub fn get(&self, signature: Option<&str>, author: Option<&str>) -> Vec<Claim> {
        let state = self.state.lock();
        let mut claims: Vec<Claim> = state
            .latest
            .values()
            .filter(|indexed| {
                signature.is_none_or(|s| indexed.claim.canonical_signature == s)
                    && author.is_none_or(|a| indexed.claim.author == a)
            })
            .map(|indexed| indexed.claim.clone())
            .collect();

        claims.sort_by(|a, b| {
            (&a.canonical_signature, &a.author).cmp(&(&b.canonical_signature, &b.author))
        });
        claims
    }

    /// Returns the latest claim per signature across all authors.
    ///
    /// A tie on timestamp resolves to the last-inserted claim, which is
    /// stable across reopen because replay preserves append order. With
    /// `since` set, only winners strictly newer than it are returned.
    pub fn get_latest(&self, signature: Option<&str>, since: Option<i64>) -> Vec<Claim> {
        let state = self.state.lock();
        let mut winners: HashMap<&str, &IndexedClaim> = HashMap::new();

        for indexed in state.latest.values() {
            if signature.is_some_and(|s| indexed.claim.canonical_signature != s) {
                continue;
            }
            if since.is_some_and(|cutoff| indexed.claim.timestamp <= cutoff) {
                continue;
            }

            let key = indexed.claim.canonical_signature.as_str();
            match winners.get(key) {
                Some(current)
                    if (current.claim.timestamp, current.seq)
                        > (indexed.claim.timestamp, indexed.seq) => {}
                _ => {
                    winners.insert(key, indexed);
                }
            }
        }

        let mut claims: Vec<Claim> = winners
            .into_values()
            .map(|indexed| indexed.claim.clone())
            .collect();
        claims.sort_by(|a, b| a.canonical_signature.cmp(&b.canonical_signature));
        claims
    }

    /// Filters a batch down to claims whose name actually differs from the
    /// stored latest claim for that `(signature, author)` pair.
    pub fn changed(&self, claims: &[Claim]) -> Vec<Claim> {
        let state = self.state.lock();
        claims
            .iter()
            .filter(|claim| {
                let key = (claim.canonical_signature.clone(), claim.author.clone());
                match state.latest.get(&key) {
                    Some(current) => current.claim.name != claim.name,
                    None => true,
                }
            })
            .cloned()
            .collect()
    }

    /// Flushes the ledger to durable storage.
    pub fn flush(&self) -> StoreResult<()> {
        self.log.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symsync_protocol::SymbolKind;
    use tempfile::TempDir;

    fn claim(author: &str, signature: &str, name: Option<&str>, timestamp: i64) -> Claim {
        Claim {
            author: author.into(),
            kind: SymbolKind::Method,
            canonical_signature: signature.into(),
            name: name.map(Into::into),
            timestamp,
        }
    }

    fn open(dir: &TempDir) -> SymbolStore {
        SymbolStore::open(&dir.path().join("p.claims")).unwrap()
    }

    #[test]
    fn double_push_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let row = claim("alice", "sig1", Some("foo"), 10);
        assert_eq!(store.push(std::slice::from_ref(&row)).unwrap(), 1);
        assert_eq!(store.push(std::slice::from_ref(&row)).unwrap(), 0);

        assert_eq!(store.get(Some("sig1"), Some("alice")).len(), 1);
    }

    #[test]
    fn get_returns_latest_per_author() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .push(&[
                claim("alice", "sig1", Some("foo"), 10),
                claim("alice", "sig1", Some("foo2"), 20),
                claim("bob", "sig1", Some("bar"), 15),
            ])
            .unwrap();

        let rows = store.get(Some("sig1"), None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].author, "alice");
        assert_eq!(rows[0].name.as_deref(), Some("foo2"));
        assert_eq!(rows[1].author, "bob");

        let alice = store.get(Some("sig1"), Some("alice"));
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].timestamp, 20);
    }

    #[test]
    fn get_latest_picks_max_timestamp_across_authors() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .push(&[
                claim("alice", "sig1", Some("foo"), 10),
                claim("bob", "sig1", Some("bar"), 20),
                claim("carol", "sig2", Some("baz"), 5),
            ])
            .unwrap();

        let latest = store.get_latest(None, None);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].name.as_deref(), Some("bar"));
        assert_eq!(latest[1].name.as_deref(), Some("baz"));
    }

    #[test]
    fn get_latest_tie_breaks_to_last_inserted() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store.push(&[claim("alice", "sig1", Some("first"), 10)]).unwrap();
        store.push(&[claim("bob", "sig1", Some("second"), 10)]).unwrap();

        let latest = store.get_latest(Some("sig1"), None);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].name.as_deref(), Some("second"));
    }

    #[test]
    fn get_latest_since_is_strict() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .push(&[
                claim("alice", "sig1", Some("old"), 10),
                claim("bob", "sig2", Some("new"), 20),
            ])
            .unwrap();

        let latest = store.get_latest(None, Some(10));
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].canonical_signature, "sig2");
    }

    #[test]
    fn changed_filters_redundant_claims() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store.push(&[claim("alice", "sig1", Some("foo"), 10)]).unwrap();

        let batch = vec![
            claim("alice", "sig1", Some("foo"), 30),  // same name, redundant
            claim("alice", "sig1", Some("new"), 40),  // renamed
            claim("bob", "sig1", Some("foo"), 50),    // new author
            claim("alice", "sig2", Some("other"), 60), // new signature
        ];

        let changed = store.changed(&batch);
        assert_eq!(changed.len(), 3);
        assert!(changed.iter().all(|c| c.timestamp != 30));
    }

    #[test]
    fn tombstones_participate_in_history() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .push(&[
                claim("alice", "sig1", Some("foo"), 10),
                claim("alice", "sig1", None, 20),
            ])
            .unwrap();

        let latest = store.get_latest(Some("sig1"), None);
        assert_eq!(latest.len(), 1);
        assert!(latest[0].is_tombstone());

        // A tombstone for a tombstone is redundant.
        let changed = store.changed(&[claim("alice", "sig1", None, 30)]);
        assert!(changed.is_empty());
    }

    #[test]
    fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.claims");

        {
            let store = SymbolStore::open(&path).unwrap();
            store
                .push(&[
                    claim("alice", "sig1", Some("foo"), 10),
                    claim("bob", "sig1", Some("bar"), 20),
                ])
                .unwrap();
            store.flush().unwrap();
        }

        let store = SymbolStore::open(&path).unwrap();
        let latest = store.get_latest(Some("sig1"), None);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].name.as_deref(), Some("bar"));

        // The replayed key set still deduplicates retransmissions.
        assert_eq!(
            store.push(&[claim("alice", "sig1", Some("foo"), 10)]).unwrap(),
            0
        );
    }
}
