//! One-shot startup upload of local renames the server has not seen.

use crate::connection::Connection;
use crate::error::ClientResult;
use std::sync::Arc;
use symsync_engine::{HostModel, RenameEngine};
use symsync_protocol::{unix_timestamp_millis, Command, ProjectId, Symbol};

/// Uploads every unsynced local rename once, at session start.
///
/// An item qualifies when its displayed name differs from its pristine
/// name, the engine has no matching rename record, and it is not a
/// virtual override. Overrides inherit their display name from the base
/// declaration; uploading both would double-report and fight over
/// evaluation, so only the base is authoritative.
pub struct SyncToServer<M: HostModel, C: Connection> {
    connection: Arc<C>,
    engine: Arc<RenameEngine<M>>,
    projects: Vec<ProjectId>,
}

impl<M: HostModel, C: Connection> SyncToServer<M, C> {
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

    /// Scans every project and uploads one batch per project. Returns the
    /// total number of symbols uploaded.
    pub fn run(&self) -> ClientResult<usize> {
        let mut uploaded = 0;
        for project in &self.projects {
            let symbols = self.collect_unsynced(project)?;
            if symbols.is_empty() {
                continue;
            }
            tracing::debug!(%project, count = symbols.len(), "uploading local renames");
            uploaded += symbols.len();

            self.connection.send_command(&Command::UpstreamSymbols {
                project: project.clone(),
                symbols,
                loggable: false,
            })?;
        }
        Ok(uploaded)
    }

    fn collect_unsynced(&self, project: &str) -> ClientResult<Vec<Symbol>> {
        let model = self.engine.model();
        let now = unix_timestamp_millis();

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
            if self.engine.is_synced(project, &symbol, true)? {
                continue;
            }
            symbols.push(symbol.timestamped(now).authored(self.engine.author()));
        }
        Ok(symbols)
    }
}
