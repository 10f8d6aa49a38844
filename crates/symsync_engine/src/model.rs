//! The seam between the engine and a host decompiler.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use symsync_protocol::SymbolKind;

/// One renameable item as the host enumerates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelItem {
    /// Kind of the item.
    pub kind: SymbolKind,
    /// Stable structural identifier of the item.
    pub canonical_signature: String,
}

/// What the engine needs from a host decompiler's in-memory model.
///
/// Adapters are expected to call back into the workflows (for example
/// `RenameListener::on_rename`) when the user renames something; the trait
/// itself only covers lookups and mutation. Any host-specific name mangling
/// (such as inner-class separator rewriting) belongs behind `apply_name`.
pub trait HostModel: Send + Sync {
    /// Enumerates every renameable item of a project.
    fn items(&self, project: &str) -> Vec<ModelItem>;

    /// Currently displayed name of an item, or `None` if it no longer
    /// exists.
    fn display_name(&self, project: &str, signature: &str) -> Option<String>;

    /// Original (pre-rename) name of an item, or `None` if it no longer
    /// exists.
    fn pristine_name(&self, project: &str, signature: &str) -> Option<String>;

    /// Applies a display name; `None` reverts the item to its pristine
    /// name. Returns false when the item cannot be resolved anymore.
    fn apply_name(&self, project: &str, signature: &str, name: Option<&str>) -> bool;

    /// True if the item is a virtual override of another method. Overrides
    /// inherit their display name from the base declaration and never
    /// upload independently.
    fn is_override(&self, project: &str, signature: &str) -> bool;
}

/// An in-memory host model for tests.
#[derive(Default)]
pub struct MemoryModel {
    items: Mutex<BTreeMap<(String, String), ItemState>>,
}

struct ItemState {
    kind: SymbolKind,
    pristine: String,
    display: String,
    is_override: bool,
}

impl MemoryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item with its pristine name as the current display name.
    pub fn add_item(
        &self,
        project: &str,
        kind: SymbolKind,
        signature: &str,
        pristine: &str,
    ) {
        self.items.lock().insert(
            (project.to_string(), signature.to_string()),
            ItemState {
                kind,
                pristine: pristine.to_string(),
                display: pristine.to_string(),
                is_override: false,
            },
        );
    }

    /// Marks an item as a virtual override.
    pub fn set_override(&self, project: &str, signature: &str) {
        if let Some(item) = self
            .items
            .lock()
            .get_mut(&(project.to_string(), signature.to_string()))
        {
            item.is_override = true;
        }
    }

    /// Sets a display name directly, simulating a user rename.
    pub fn rename(&self, project: &str, signature: &str, name: &str) {
        if let Some(item) = self
            .items
            .lock()
            .get_mut(&(project.to_string(), signature.to_string()))
        {
            item.display = name.to_string();
        }
    }

    /// Removes an item, simulating an out-of-band deletion.
    pub fn remove_item(&self, project: &str, signature: &str) {
        self.items
            .lock()
            .remove(&(project.to_string(), signature.to_string()));
    }
}

impl HostModel for MemoryModel {
    fn items(&self, project: &str) -> Vec<ModelItem> {
        self.items
            .lock()
            .iter()
            .filter(|((p, _), _)| p == project)
            .map(|((_, signature), state)| ModelItem {
                kind: state.kind,
                canonical_signature: signature.clone(),
            })
            .collect()
    }

    fn display_name(&self, project: &str, signature: &str) -> Option<String> {
        self.items
            .lock()
            .get(&(project.to_string(), signature.to_string()))
            .map(|state| state.display.clone())
    }

    fn pristine_name(&self, project: &str, signature: &str) -> Option<String> {
        self.items
            .lock()
            .get(&(project.to_string(), signature.to_string()))
            .map(|state| state.pristine.clone())
    }

    fn apply_name(&self, project: &str, signature: &str, name: Option<&str>) -> bool {
        let mut items = self.items.lock();
        match items.get_mut(&(project.to_string(), signature.to_string())) {
            Some(state) => {
                state.display = match name {
                    Some(name) => name.to_string(),
                    None => state.pristine.clone(),
                };
                true
            }
            None => false,
        }
    }

    fn is_override(&self, project: &str, signature: &str) -> bool {
        self.items
            .lock()
            .get(&(project.to_string(), signature.to_string()))
            .is_some_and(|state| state.is_override)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_model_basics() {
        let model = MemoryModel::new();
        model.add_item("p1", SymbolKind::Class, "sig1", "Foo");

        assert_eq!(model.display_name("p1", "sig1").as_deref(), Some("Foo"));
        assert_eq!(model.pristine_name("p1", "sig1").as_deref(), Some("Foo"));
        assert_eq!(model.items("p1").len(), 1);
        assert!(model.items("p2").is_empty());

        assert!(model.apply_name("p1", "sig1", Some("Bar")));
        assert_eq!(model.display_name("p1", "sig1").as_deref(), Some("Bar"));

        assert!(model.apply_name("p1", "sig1", None));
        assert_eq!(model.display_name("p1", "sig1").as_deref(), Some("Foo"));
    }

    #[test]
    fn apply_to_missing_item_fails() {
        let model = MemoryModel::new();
        assert!(!model.apply_name("p1", "gone", Some("Bar")));
    }

    #[test]
    fn override_flag() {
        let model = MemoryModel::new();
        model.add_item("p1", SymbolKind::Method, "base", "run");
        model.add_item("p1", SymbolKind::Method, "derived", "run");
        model.set_override("p1", "derived");

        assert!(!model.is_override("p1", "base"));
        assert!(model.is_override("p1", "derived"));
    }
}
