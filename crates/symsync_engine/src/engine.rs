//! The rename reconciliation engine.

use crate::error::{EngineError, EngineResult};
use crate::evaluator::{ConflictEvaluator, MaxTimestamp};
use crate::model::HostModel;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use symsync_protocol::{unix_timestamp_millis, ProjectId, Symbol, SymbolKind};
use symsync_store::{Claim, ClientStore, RenameRecord};

/// Metadata key for the incremental-sync cursor.
pub const LAST_SYNC_KEY: &str = "last_sync";

/// Whether the engine is currently applying a claim to the host model.
///
/// While `Applying`, rename notifications raised by the host are echoes of
/// the engine's own mutation and must not be re-uploaded. Listeners query
/// this through [`RenameEngine::is_applying`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    /// No apply in progress; host notifications are genuine user edits.
    Idle,
    /// The engine is mutating the host model.
    Applying,
}

/// Reconciles the host model's displayed names against the set of known
/// remote claims, and tracks which signatures still have pending work.
///
/// The engine owns one [`ClientStore`] per project, opened lazily under
/// the configured root directory. Inbound claims are recorded first and
/// applied later by a flush pass, so a burst (a full sync, say) coalesces
/// into one apply per signature.
pub struct RenameEngine<M: HostModel> {
    author: String,
    model: Arc<M>,
    root: PathBuf,
    evaluator: Box<dyn ConflictEvaluator>,
    stores: Mutex<HashMap<ProjectId, Arc<ClientStore>>>,
    dirty: Mutex<HashMap<ProjectId, BTreeSet<(SymbolKind, String)>>>,
    records_lock: Mutex<()>,
    apply_serial: Mutex<()>,
    apply_state: Mutex<ApplyState>,
}

/// RAII guard for the `Applying` state.
struct ApplyGuard<'a> {
    _serial: MutexGuard<'a, ()>,
    state: &'a Mutex<ApplyState>,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = ApplyState::Idle;
    }
}

impl<M: HostModel> RenameEngine<M> {
    /// Creates an engine with the default max-timestamp evaluator.
    pub fn new(author: impl Into<String>, model: Arc<M>, root: impl Into<PathBuf>) -> Self {
        Self::with_evaluator(author, model, root, Box::new(MaxTimestamp))
    }

    /// Creates an engine with a custom conflict evaluator.
    pub fn with_evaluator(
        author: impl Into<String>,
        model: Arc<M>,
        root: impl Into<PathBuf>,
        evaluator: Box<dyn ConflictEvaluator>,
    ) -> Self {
        Self {
            author: author.into(),
            model,
            root: root.into(),
            evaluator,
            stores: Mutex::new(HashMap::new()),
            dirty: Mutex::new(HashMap::new()),
            records_lock: Mutex::new(()),
            apply_serial: Mutex::new(()),
            apply_state: Mutex::new(ApplyState::Idle),
        }
    }

    /// This client's display name, used to attribute local claims.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// The host model the engine reconciles against.
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// True while a claim is being applied to the host model.
    pub fn is_applying(&self) -> bool {
        *self.apply_state.lock() == ApplyState::Applying
    }

    fn begin_apply(&self) -> ApplyGuard<'_> {
        let serial = self.apply_serial.lock();
        *self.apply_state.lock() = ApplyState::Applying;
        ApplyGuard {
            _serial: serial,
            state: &self.apply_state,
        }
    }

    fn store(&self, project: &str) -> EngineResult<Arc<ClientStore>> {
        if let Some(store) = self.stores.lock().get(project) {
            return Ok(Arc::clone(store));
        }

        let path = self.root.join(format!("{project}.client"));
        let store = Arc::new(ClientStore::open(&path)?);

        let mut stores = self.stores.lock();
        let entry = stores
            .entry(project.to_string())
            .or_insert_with(|| Arc::clone(&store));
        Ok(Arc::clone(entry))
    }

    /// Records a batch of observed claims.
    ///
    /// Each symbol is classified: a name of `None`, or one equal to the
    /// item's pristine name, is a deletion and drops that author's
    /// mirrored claim; anything else replaces it. With `dirty` set the
    /// signatures are queued for a later flush instead of being applied
    /// immediately.
    pub fn record(&self, project: &str, symbols: &[Symbol], dirty: bool) -> EngineResult<()> {
        let store = self.store(project)?;
        let now = unix_timestamp_millis();

        let mut touched = Vec::new();
        for symbol in symbols {
            let Some(claim) = Claim::from_symbol(symbol, now) else {
                tracing::warn!(
                    signature = %symbol.canonical_signature,
                    "dropping claim without an author"
                );
                continue;
            };

            let pristine = self.model.pristine_name(project, &claim.canonical_signature);
            let deleted =
                claim.name.is_none() || (pristine.is_some() && claim.name == pristine);
            if deleted {
                store.remove_claim(&claim.author, &claim.canonical_signature)?;
            } else {
                store.upsert_claims(std::slice::from_ref(&claim))?;
            }
            touched.push((claim.kind, claim.canonical_signature));
        }

        if dirty {
            self.dirty
                .lock()
                .entry(project.to_string())
                .or_default()
                .extend(touched);
        }
        Ok(())
    }

    /// Resolves the winning claim for a signature across all authors.
    ///
    /// `None` means no claim is known and the signature resolves to its
    /// pristine name.
    pub fn evaluate(&self, project: &str, signature: &str) -> EngineResult<Option<Claim>> {
        let store = self.store(project)?;
        let claims = store.claims_for(signature);
        let winner = self.evaluator.winner(&claims);

        if let Some(claim) = &winner {
            if claim.canonical_signature != signature {
                return Err(EngineError::EvaluatorInconsistency {
                    expected: signature.to_string(),
                    actual: claim.canonical_signature.clone(),
                });
            }
        }
        Ok(winner)
    }

    /// Persists the name this client applied for a signature; `None`
    /// clears the record.
    pub fn record_rename(
        &self,
        project: &str,
        kind: SymbolKind,
        signature: &str,
        name: Option<&str>,
    ) -> EngineResult<()> {
        let store = self.store(project)?;
        let _guard = self.records_lock.lock();
        store.record_rename(signature, kind, name)?;
        Ok(())
    }

    /// The rename last applied for a signature, if any.
    pub fn recorded_rename(
        &self,
        project: &str,
        signature: &str,
    ) -> EngineResult<Option<RenameRecord>> {
        Ok(self.store(project)?.recorded_rename(signature))
    }

    /// Every recorded rename of a project, for reversion scans.
    pub fn recorded_renames(&self, project: &str) -> EngineResult<Vec<RenameRecord>> {
        Ok(self.store(project)?.renames())
    }

    /// Resolves and applies the winner for one signature.
    ///
    /// Order matters: the resolved value is recorded as latest-known
    /// *before* the apply, and rolled back if the host model rejects the
    /// apply (target deleted out-of-band). A crash between those two
    /// steps leaves a record that looks applied; the next reconciliation
    /// scan re-diffs records against the model and heals it.
    pub fn flush(&self, project: &str, kind: SymbolKind, signature: &str) -> EngineResult<()> {
        let winner = self.evaluate(project, signature)?;
        let resolved_kind = winner.as_ref().map(|c| c.kind).unwrap_or(kind);
        let resolved_name = winner.and_then(|c| c.name);

        let previous = self.recorded_rename(project, signature)?;
        self.record_rename(project, resolved_kind, signature, resolved_name.as_deref())?;

        let applied = {
            let _guard = self.begin_apply();
            self.model
                .apply_name(project, signature, resolved_name.as_deref())
        };

        if !applied {
            tracing::warn!(project, signature, "apply rejected, rolling back record");
            let prev_kind = previous.as_ref().map(|r| r.kind).unwrap_or(resolved_kind);
            let prev_name = previous.as_ref().map(|r| r.name.as_str());
            self.record_rename(project, prev_kind, signature, prev_name)?;
        }

        if let Some(set) = self.dirty.lock().get_mut(project) {
            set.remove(&(kind, signature.to_string()));
        }
        Ok(())
    }

    /// Flushes every dirty signature of every project.
    pub fn flush_all(&self) -> EngineResult<()> {
        let snapshot: Vec<(ProjectId, Vec<(SymbolKind, String)>)> = self
            .dirty
            .lock()
            .iter()
            .map(|(project, keys)| (project.clone(), keys.iter().cloned().collect()))
            .collect();

        for (project, keys) in snapshot {
            for (kind, signature) in keys {
                self.flush(&project, kind, &signature)?;
            }
        }
        Ok(())
    }

    /// True if the observed state of an item agrees with what this client
    /// last applied: not renamed with no record, or renamed to exactly
    /// the recorded name.
    pub fn is_synced(
        &self,
        project: &str,
        symbol: &Symbol,
        currently_renamed: bool,
    ) -> EngineResult<bool> {
        let recorded = self.recorded_rename(project, &symbol.canonical_signature)?;
        Ok(match recorded {
            None => !currently_renamed,
            Some(record) => {
                currently_renamed && symbol.name.as_deref() == Some(record.name.as_str())
            }
        })
    }

    /// The incremental-sync cursor from the last completed full sync.
    pub fn last_sync(&self, project: &str) -> EngineResult<Option<i64>> {
        Ok(self
            .store(project)?
            .meta(LAST_SYNC_KEY)
            .and_then(|value| value.parse().ok()))
    }

    /// Stores the incremental-sync cursor.
    pub fn set_last_sync(&self, project: &str, timestamp: i64) -> EngineResult<()> {
        self.store(project)?
            .set_meta(LAST_SYNC_KEY, &timestamp.to_string())?;
        Ok(())
    }
}
