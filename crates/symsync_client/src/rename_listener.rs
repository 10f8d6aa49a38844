//! Event-driven upload of individual user renames.

use crate::connection::Connection;
use crate::error::ClientResult;
use std::sync::Arc;
use symsync_engine::{HostModel, RenameEngine};
use symsync_protocol::{unix_timestamp_millis, Command, Symbol};

/// Uploads a single symbol whenever the host reports a user rename.
///
/// The host adapter wires its rename-notification callback to
/// [`RenameListener::on_rename`]. Notifications raised while the engine
/// is applying a remote claim are echoes of the engine's own mutation and
/// are dropped, which is what keeps two connected clients from bouncing
/// the same rename back and forth forever.
pub struct RenameListener<M: HostModel, C: Connection> {
    connection: Arc<C>,
    engine: Arc<RenameEngine<M>>,
}

impl<M: HostModel, C: Connection> RenameListener<M, C> {
    /// Creates the listener.
    pub fn new(connection: Arc<C>, engine: Arc<RenameEngine<M>>) -> Self {
        Self { connection, engine }
    }

    /// Handles one rename notification from the host. Returns whether the
    /// symbol was uploaded.
    pub fn on_rename(&self, project: &str, symbol: Symbol) -> ClientResult<bool> {
        if self.engine.is_applying() {
            tracing::trace!(
                signature = %symbol.canonical_signature,
                "suppressing echo of an applied claim"
            );
            return Ok(false);
        }
        if self
            .engine
            .model()
            .is_override(project, &symbol.canonical_signature)
        {
            return Ok(false);
        }

        let symbol = symbol
            .timestamped(unix_timestamp_millis())
            .authored(self.engine.author());
        self.connection.send_command(&Command::UpstreamSymbols {
            project: project.to_string(),
            symbols: vec![symbol],
            loggable: true,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnection;
    use symsync_engine::MemoryModel;
    use symsync_protocol::SymbolKind;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> RenameListener<MemoryModel, MockConnection> {
        let model = Arc::new(MemoryModel::new());
        model.add_item("p1", SymbolKind::Method, "sig1", "run");
        model.add_item("p1", SymbolKind::Method, "sig_override", "run");
        model.set_override("p1", "sig_override");

        let engine = Arc::new(RenameEngine::new("me", model, dir.path()));
        RenameListener::new(Arc::new(MockConnection::new()), engine)
    }

    #[test]
    fn uploads_a_stamped_single_symbol() {
        let dir = TempDir::new().unwrap();
        let listener = setup(&dir);

        let symbol = Symbol::new(SymbolKind::Method, "sig1").named("start");
        assert!(listener.on_rename("p1", symbol).unwrap());

        let sent = listener.connection.sent_commands().unwrap();
        assert_eq!(sent.len(), 1);
        let Command::UpstreamSymbols {
            symbols, loggable, ..
        } = &sent[0]
        else {
            panic!("expected an upstream command");
        };
        assert!(loggable);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].author.as_deref(), Some("me"));
        assert!(symbols[0].timestamp.is_some());
    }

    #[test]
    fn overrides_never_upload() {
        let dir = TempDir::new().unwrap();
        let listener = setup(&dir);

        let symbol = Symbol::new(SymbolKind::Method, "sig_override").named("start");
        assert!(!listener.on_rename("p1", symbol).unwrap());
        assert!(listener.connection.sent().is_empty());
    }
}
