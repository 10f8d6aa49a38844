//! Lazy per-project store cache.

use crate::error::{StoreError, StoreResult};
use crate::store::SymbolStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use symsync_protocol::ProjectId;

/// Opens project ledgers on first reference and caches them.
///
/// Stores are independent: failure to open one project's ledger is
/// reported to that caller only and does not disturb already-open stores.
pub struct StoreRegistry {
    directory: PathBuf,
    stores: Mutex<HashMap<ProjectId, Arc<SymbolStore>>>,
}

impl StoreRegistry {
    /// Creates a registry rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store for `project`, opening it on first use.
    pub fn open(&self, project: &str) -> StoreResult<Arc<SymbolStore>> {
        validate_project_id(project)?;

        if let Some(store) = self.stores.lock().get(project) {
            return Ok(Arc::clone(store));
        }

        // Opened outside the lock so a slow open cannot stall lookups of
        // already-cached projects.
        let path = self.directory.join(format!("{project}.claims"));
        let store = Arc::new(SymbolStore::open(&path)?);

        let mut stores = self.stores.lock();
        let entry = stores
            .entry(project.to_string())
            .or_insert_with(|| Arc::clone(&store));
        Ok(Arc::clone(entry))
    }

    /// Flushes and drops every cached store.
    pub fn close_all(&self) -> StoreResult<()> {
        let stores = std::mem::take(&mut *self.stores.lock());
        for store in stores.values() {
            store.flush()?;
        }
        Ok(())
    }
}

/// Project ids become file names; anything that could escape the store
/// directory is refused.
fn validate_project_id(project: &str) -> StoreResult<()> {
    let acceptable = !project.is_empty()
        && project != "."
        && project != ".."
        && !project.contains(std::path::is_separator)
        && !project.contains('\0');
    if acceptable {
        Ok(())
    } else {
        Err(StoreError::InvalidProject(project.to_string()))
    }
}
