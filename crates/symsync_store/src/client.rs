//! Client-side per-project store.

use crate::claim::Claim;
use crate::error::{StoreError, StoreResult};
use crate::log::RecordLog;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use symsync_protocol::SymbolKind;

/// The client's last-applied rename for one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    /// Stable structural identifier of the item.
    pub canonical_signature: String,
    /// Kind of the renamed item.
    pub kind: SymbolKind,
    /// The applied display name.
    pub name: String,
}

/// One replayable client store mutation.
#[derive(Debug, Serialize, Deserialize)]
enum ClientRecord {
    /// Upsert of the claim mirror, keyed `(author, signature)`.
    Claim(Claim),
    /// Removal of a mirrored claim.
    RemoveClaim {
        author: String,
        canonical_signature: String,
    },
    /// A rename was applied locally.
    Rename(RenameRecord),
    /// A recorded rename was cleared (item reverted).
    ClearRename { canonical_signature: String },
    /// Metadata property write.
    Meta { key: String, value: String },
}

/// Client-side store for one project.
///
/// Holds three tables, all replayed from one record log:
/// - a mirror of remote claims, *latest only* per `(author, signature)`
///   (unlike the server ledger, history is not retained here),
/// - rename records: which name this client last applied per signature,
/// - string metadata such as the incremental-sync cursor.
pub struct ClientStore {
    log: RecordLog,
    state: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    claims: HashMap<(String, String), Claim>,
    renames: HashMap<String, RenameRecord>,
    meta: HashMap<String, String>,
}

impl ClientState {
    fn apply(&mut self, record: ClientRecord) {
        match record {
            ClientRecord::Claim(claim) => {
                let key = (claim.author.clone(), claim.canonical_signature.clone());
                self.claims.insert(key, claim);
            }
            ClientRecord::RemoveClaim {
                author,
                canonical_signature,
            } => {
                self.claims.remove(&(author, canonical_signature));
            }
            ClientRecord::Rename(record) => {
                self.renames
                    .insert(record.canonical_signature.clone(), record);
            }
            ClientRecord::ClearRename {
                canonical_signature,
            } => {
                self.renames.remove(&canonical_signature);
            }
            ClientRecord::Meta { key, value } => {
                self.meta.insert(key, value);
            }
        }
    }
}

impl ClientStore {
    /// Opens or creates the client store at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let (log, payloads) = RecordLog::open(path, false)?;

        let mut state = ClientState::default();
        for payload in payloads {
            let record: ClientRecord = ciborium::de::from_reader(payload.as_slice())
                .map_err(|e| StoreError::Corrupted(e.to_string()))?;
            state.apply(record);
        }

        Ok(Self {
            log,
            state: Mutex::new(state),
        })
    }

    fn write(&self, record: ClientRecord) -> StoreResult<()> {
        let mut payload = Vec::new();
        ciborium::ser::into_writer(&record, &mut payload)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.log.append(&payload)?;
        self.state.lock().apply(record);
        Ok(())
    }

    /// Replaces the mirrored claim for each `(author, signature)` pair.
    pub fn upsert_claims(&self, claims: &[Claim]) -> StoreResult<()> {
        for claim in claims {
            self.write(ClientRecord::Claim(claim.clone()))?;
        }
        Ok(())
    }

    /// Drops the mirrored claim for `(author, signature)`, if any.
    pub fn remove_claim(&self, author: &str, canonical_signature: &str) -> StoreResult<()> {
        self.write(ClientRecord::RemoveClaim {
            author: author.to_string(),
            canonical_signature: canonical_signature.to_string(),
        })
    }

    /// Every author's mirrored claim for one signature.
    pub fn claims_for(&self, canonical_signature: &str) -> Vec<Claim> {
        let state = self.state.lock();
        let mut claims: Vec<Claim> = state
            .claims
            .values()
            .filter(|claim| claim.canonical_signature == canonical_signature)
            .cloned()
            .collect();
        claims.sort_by(|a, b| a.author.cmp(&b.author));
        claims
    }

    /// Records the name this client just applied, or clears the record
    /// when `name` is `None`.
    pub fn record_rename(
        &self,
        canonical_signature: &str,
        kind: SymbolKind,
        name: Option<&str>,
    ) -> StoreResult<()> {
        match name {
            Some(name) => self.write(ClientRecord::Rename(RenameRecord {
                canonical_signature: canonical_signature.to_string(),
                kind,
                name: name.to_string(),
            })),
            None => self.write(ClientRecord::ClearRename {
                canonical_signature: canonical_signature.to_string(),
            }),
        }
    }

    /// The rename last applied for a signature, if any.
    pub fn recorded_rename(&self, canonical_signature: &str) -> Option<RenameRecord> {
        self.state.lock().renames.get(canonical_signature).cloned()
    }

    /// Every recorded rename, for reversion scans.
    pub fn renames(&self) -> Vec<RenameRecord> {
        let mut records: Vec<RenameRecord> =
            self.state.lock().renames.values().cloned().collect();
        records.sort_by(|a, b| a.canonical_signature.cmp(&b.canonical_signature));
        records
    }

    /// Reads a metadata property.
    pub fn meta(&self, key: &str) -> Option<String> {
        self.state.lock().meta.get(key).cloned()
    }

    /// Writes a metadata property.
    pub fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        self.write(ClientRecord::Meta {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Flushes the store to durable storage.
    pub fn flush(&self) -> StoreResult<()> {
        self.log.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn open(dir: &TempDir) -> ClientStore {
        ClientStore::open(&dir.path().join("client.db")).unwrap()
    }

    #[test]
    fn upsert_replaces_per_author() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .upsert_claims(&[
                claim("alice", "sig1", Some("foo"), 10),
                claim("alice", "sig1", Some("foo2"), 20),
                claim("bob", "sig1", Some("bar"), 15),
            ])
            .unwrap();

        let claims = store.claims_for("sig1");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].name.as_deref(), Some("foo2"));
        assert_eq!(claims[1].name.as_deref(), Some("bar"));
    }

    #[test]
    fn remove_claim_drops_one_author() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .upsert_claims(&[
                claim("alice", "sig1", Some("foo"), 10),
                claim("bob", "sig1", Some("bar"), 15),
            ])
            .unwrap();
        store.remove_claim("alice", "sig1").unwrap();

        let claims = store.claims_for("sig1");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].author, "bob");
    }

    #[test]
    fn rename_records_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .record_rename("sig1", SymbolKind::Class, Some("Parser"))
            .unwrap();
        assert_eq!(
            store.recorded_rename("sig1").unwrap().name,
            "Parser".to_string()
        );

        store.record_rename("sig1", SymbolKind::Class, None).unwrap();
        assert!(store.recorded_rename("sig1").is_none());
    }

    #[test]
    fn metadata_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        assert!(store.meta("last_sync").is_none());
        store.set_meta("last_sync", "12345").unwrap();
        assert_eq!(store.meta("last_sync").as_deref(), Some("12345"));

        store.set_meta("last_sync", "67890").unwrap();
        assert_eq!(store.meta("last_sync").as_deref(), Some("67890"));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.db");

        {
            let store = ClientStore::open(&path).unwrap();
            store
                .upsert_claims(&[claim("alice", "sig1", Some("foo"), 10)])
                .unwrap();
            store
                .record_rename("sig1", SymbolKind::Method, Some("foo"))
                .unwrap();
            store.set_meta("last_sync", "42").unwrap();
            store.flush().unwrap();
        }

        let store = ClientStore::open(&path).unwrap();
        assert_eq!(store.claims_for("sig1").len(), 1);
        assert_eq!(store.recorded_rename("sig1").unwrap().name, "foo");
        assert_eq!(store.meta("last_sync").as_deref(), Some("42"));
    }

    #[test]
    fn renames_lists_all_signatures() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .record_rename("sig_b", SymbolKind::Field, Some("count"))
            .unwrap();
        store
            .record_rename("sig_a", SymbolKind::Class, Some("Parser"))
            .unwrap();

        let records = store.renames();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].canonical_signature, "sig_a");
        assert_eq!(records[1].canonical_signature, "sig_b");
    }
}
