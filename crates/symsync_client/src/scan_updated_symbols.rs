//! Periodic reconciliation: finds renames and reversions by diffing.

use crate::connection::Connection;
use crate::error::ClientResult;
use std::sync::Arc;
use symsync_engine::{HostModel, RenameEngine};
use symsync_protocol::{unix_timestamp_millis, Command, ProjectId, Symbol};

/// Reconciles recorded rename state against what the model displays now.
///
/// Two passes per project:
///
/// - **forward**: renamed, unsynced, non-override items are picked up the
///   same way the startup upload picks them up;
/// - **reversion**: a recorded rename whose item is back to its pristine
///   name means the user reverted it. Reverting raises no rename event in
///   any host, so it can only be found by diffing; each one becomes a
///   tombstone claim.
///
/// Everything found is recorded and flushed locally, then uploaded in one
/// batch per project.
pub struct ScanUpdatedSymbols<M: HostModel, C: Connection> {
    connection: Arc<C>,
    engine: Arc<RenameEngine<M>>,
    projects: Vec<ProjectId>,
}

impl<M: HostModel, C: Connection> ScanUpdatedSymbols<M, C> {
    /// Creates the workflow over the given projects.
    pub fn new(
        connection: Arc<C>,
        engine: Arc<RenameEngine<M>>,
        projects: Vec<ProjectId>,
    ) -> Self {
        Self {
            connection,
            engine,
            projects,
        }
    }

    /// Runs both passes over every project. Returns the total number of
    /// symbols uploaded.
    pub fn run(&self) -> ClientResult<usize> {
        let mut uploaded = 0;
        for project in &self.projects {
            let mut updated = self.forward_pass(project)?;
            updated.extend(self.reversion_pass(project)?);
            uploaded += self.handle_updated(project, updated)?;
        }
        Ok(uploaded)
    }

    fn forward_pass(&self, project: &str) -> ClientResult<Vec<Symbol>> {
        let model = self.engine.model();

        let mut symbols = Vec::new();
        for item in model.items(project) {
            let signature = &item.canonical_signature;
            let (Some(display), Some(pristine)) = (
                model.display_name(project, signature),
                model.pristine_name(project, signature),
            ) else {
                continue;
            };
            if display == pristine || model.is_override(project, signature) {
                continue;
            }

            let symbol = Symbol::new(item.kind, signature.clone()).named(display);
            if !self.engine.is_synced(project, &symbol, true)? {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    fn reversion_pass(&self, project: &str) -> ClientResult<Vec<Symbol>> {
        let model = self.engine.model();

        let mut tombstones = Vec::new();
        for record in self.engine.recorded_renames(project)? {
            let signature = &record.canonical_signature;
            let (Some(display), Some(pristine)) = (
                model.display_name(project, signature),
                model.pristine_name(project, signature),
            ) else {
                continue;
            };
            if display == pristine {
                tracing::debug!(%project, %signature, "detected reverted symbol");
                tombstones.push(Symbol::new(record.kind, signature.clone()));
            }
        }
        Ok(tombstones)
    }

    /// Records and flushes the found symbols locally, then uploads them.
    fn handle_updated(&self, project: &str, symbols: Vec<Symbol>) -> ClientResult<usize> {
        if symbols.is_empty() {
            return Ok(0);
        }

        let now = unix_timestamp_millis();
        let symbols: Vec<Symbol> = symbols
            .into_iter()
            .map(|symbol| symbol.timestamped(now).authored(self.engine.author()))
            .collect();

        for symbol in &symbols {
            self.engine.record_rename(
                project,
                symbol.kind,
                &symbol.canonical_signature,
                symbol.name.as_deref(),
            )?;
        }
        self.engine.record(project, &symbols, true)?;
        self.engine.flush_all()?;

        let count = symbols.len();
        self.connection.send_command(&Command::UpstreamSymbols {
            project: project.to_string(),
            symbols,
            loggable: false,
        })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnection;
    use symsync_engine::MemoryModel;
    use symsync_protocol::SymbolKind;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> ScanUpdatedSymbols<MemoryModel, MockConnection> {
        let model = Arc::new(MemoryModel::new());
        model.add_item("p1", SymbolKind::Class, "sig1", "Foo");

        let engine = Arc::new(RenameEngine::new("me", model, dir.path()));
        ScanUpdatedSymbols::new(
            Arc::new(MockConnection::new()),
            engine,
            vec!["p1".into()],
        )
    }

    #[test]
    fn forward_pass_uploads_and_records() {
        let dir = TempDir::new().unwrap();
        let scan = setup(&dir);
        scan.engine.model().rename("p1", "sig1", "Bar");

        assert_eq!(scan.run().unwrap(), 1);

        // The rename is now recorded, so a second pass finds nothing.
        assert_eq!(
            scan.engine
                .recorded_rename("p1", "sig1")
                .unwrap()
                .unwrap()
                .name,
            "Bar"
        );
        assert_eq!(scan.run().unwrap(), 0);

        let sent = scan.connection.sent_commands().unwrap();
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn reversion_emits_a_tombstone() {
        let dir = TempDir::new().unwrap();
        let scan = setup(&dir);
        let model = scan.engine.model();

        // A rename is recorded, then the user reverts the item by hand.
        model.rename("p1", "sig1", "Bar");
        scan.engine
            .record_rename("p1", SymbolKind::Class, "sig1", Some("Bar"))
            .unwrap();
        model.rename("p1", "sig1", "Foo");

        assert_eq!(scan.run().unwrap(), 1);

        let sent = scan.connection.sent_commands().unwrap();
        let Command::UpstreamSymbols { symbols, .. } = &sent[0] else {
            panic!("expected an upstream command");
        };
        assert_eq!(symbols.len(), 1);
        assert!(symbols[0].is_tombstone());
        assert_eq!(symbols[0].canonical_signature, "sig1");

        // Afterwards the item is synced-with-no-rename.
        assert!(scan.engine.recorded_rename("p1", "sig1").unwrap().is_none());
        let observed = Symbol::new(SymbolKind::Class, "sig1").named("Foo");
        assert!(scan.engine.is_synced("p1", &observed, false).unwrap());
        assert_eq!(scan.run().unwrap(), 0);
    }

    #[test]
    fn reversion_yields_to_a_remaining_remote_claim() {
        let dir = TempDir::new().unwrap();
        let scan = setup(&dir);
        let model = scan.engine.model();

        // Someone else also claimed a name for sig1.
        scan.engine
            .record(
                "p1",
                &[Symbol::new(SymbolKind::Class, "sig1")
                    .named("Remote")
                    .timestamped(5)
                    .authored("alice")],
                false,
            )
            .unwrap();

        // This client renamed and then reverted.
        model.rename("p1", "sig1", "Bar");
        scan.engine
            .record_rename("p1", SymbolKind::Class, "sig1", Some("Bar"))
            .unwrap();
        model.rename("p1", "sig1", "Foo");

        scan.run().unwrap();

        // The flush after the tombstone resolves to alice's claim.
        assert_eq!(model.display_name("p1", "sig1").as_deref(), Some("Remote"));
        assert_eq!(
            scan.engine
                .recorded_rename("p1", "sig1")
                .unwrap()
                .unwrap()
                .name,
            "Remote"
        );
    }
}
