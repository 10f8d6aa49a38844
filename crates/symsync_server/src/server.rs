//! The broker itself: accept loop, per-connection dispatch, fan-out.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::sessions::{SessionId, SessionRegistry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use symsync_protocol::{
    read_frame_async, read_handshake_async, unix_timestamp_millis, write_frame_async, Command,
    ProjectId, Symbol,
};
use symsync_store::{Claim, StoreRegistry};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// The central rename broker.
///
/// Every connection goes through three states: handshaking (waiting for
/// the bare name frame), active (decode/dispatch loop) and closed (any
/// I/O failure removes the session from every subscriber set and drops
/// it).
pub struct SymbolServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

struct Shared {
    config: ServerConfig,
    stores: StoreRegistry,
    sessions: SessionRegistry,
    /// Per-project upload serialization, for the total-order guarantee.
    upload_order: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl Shared {
    fn upload_lock(&self, project: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.upload_order
                .lock()
                .entry(project.to_string())
                .or_default(),
        )
    }
}

impl SymbolServer {
    /// Binds the listener described by `config`.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            directory = %config.store_directory.display(),
            "listening"
        );

        let stores = StoreRegistry::new(config.store_directory.clone());
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                config,
                stores,
                sessions: SessionRegistry::default(),
                upload_order: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The address the server actually bound (useful with port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the task is cancelled.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                handle_connection(shared, stream, addr).await;
            });
        }
    }

    /// Flushes and releases every open project store.
    pub fn close(&self) -> ServerResult<()> {
        self.shared.stores.close_all()?;
        Ok(())
    }
}

async fn handle_connection(shared: Arc<Shared>, stream: TcpStream, addr: SocketAddr) {
    let (mut reader, mut writer) = stream.into_split();

    // Handshaking: the first frame is the bare display name.
    let name = match read_handshake_async(&mut reader).await {
        Ok(name) => name,
        Err(error) => {
            tracing::debug!(%addr, %error, "handshake failed");
            return;
        }
    };
    tracing::info!(%name, %addr, "client connected");

    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let session = shared.sessions.register(name.clone(), addr, outbox);

    let writer_task = tokio::spawn(async move {
        while let Some(payload) = outbox_rx.recv().await {
            if write_frame_async(&mut writer, &payload).await.is_err() {
                break;
            }
        }
    });

    // Active: decode/dispatch until the socket dies.
    read_loop(&shared, session, &name, &mut reader).await;

    // Closed: clear the session from every subscriber set.
    tracing::info!(%name, %addr, "client disconnected");
    shared.sessions.remove(session);
    writer_task.abort();
}

async fn read_loop(
    shared: &Arc<Shared>,
    session: SessionId,
    name: &str,
    reader: &mut OwnedReadHalf,
) {
    loop {
        let payload = match read_frame_async(reader).await {
            Ok(payload) => payload,
            Err(error) => {
                if !error.is_disconnect() {
                    tracing::warn!(%name, %error, "closing connection");
                }
                return;
            }
        };

        // A frame that fails to decode is dropped; the stream itself is
        // still framed correctly, so the session continues.
        let command = match Command::decode(&payload) {
            Ok(command) => command,
            Err(error) => {
                tracing::warn!(%name, %error, "dropping undecodable frame");
                continue;
            }
        };

        if let Err(error) = dispatch(shared, session, name, command) {
            tracing::error!(%name, %error, "command failed");
        }
    }
}

fn dispatch(
    shared: &Arc<Shared>,
    session: SessionId,
    name: &str,
    command: Command,
) -> ServerResult<()> {
    match command {
        Command::Subscribe { project } => {
            tracing::info!(%name, %project, "subscribe");
            shared.sessions.subscribe(session, &project);
        }
        Command::Unsubscribe { project } => {
            tracing::info!(%name, %project, "unsubscribe");
            shared.sessions.unsubscribe(session, &project);
        }
        Command::UpstreamSymbols {
            project,
            symbols,
            loggable,
        } => {
            handle_upstream(shared, session, name, &project, symbols, loggable)?;
        }
        Command::FullSyncRequest { project, since } => {
            tracing::info!(%name, %project, ?since, "full sync");
            handle_full_sync(shared, session, &project, since)?;
        }
        Command::ResourceRequest { name: resource } => {
            let content = shared
                .config
                .resource_directory
                .as_deref()
                .and_then(|directory| read_resource(directory, &resource));
            let reply = Command::ResourceResponse {
                name: resource,
                content,
            };
            shared.sessions.send_to(session, reply.encode()?);
        }
        // Server-to-client commands have no meaning upstream.
        Command::DownstreamSymbols { .. }
        | Command::FullSyncComplete { .. }
        | Command::ResourceResponse { .. } => {
            tracing::warn!(%name, "ignoring client-sent server command");
        }
    }
    Ok(())
}

fn handle_upstream(
    shared: &Arc<Shared>,
    session: SessionId,
    name: &str,
    project: &str,
    symbols: Vec<Symbol>,
    loggable: bool,
) -> ServerResult<()> {
    let store = shared.stores.open(project)?;
    let now = unix_timestamp_millis();

    // The client-supplied author field is never trusted.
    let claims: Vec<Claim> = symbols
        .into_iter()
        .filter_map(|symbol| Claim::from_symbol(&symbol.authored(name), now))
        .collect();

    // Filter, persist and enqueue under the project's upload lock so
    // every subscriber sees updates in processing order.
    let order = shared.upload_lock(project);
    let _guard = order.lock();

    // Re-claiming a name already on record is noise; drop it before it
    // reaches the ledger or the subscribers.
    let claims = store.changed(&claims);
    if claims.is_empty() {
        return Ok(());
    }

    if loggable {
        for claim in &claims {
            tracing::info!(
                author = %claim.author,
                %project,
                signature = %claim.canonical_signature,
                name = ?claim.name,
                "symbol"
            );
        }
    }

    let stamped: Vec<Symbol> = claims.iter().map(Claim::to_symbol).collect();
    let payload = Command::DownstreamSymbols {
        project: project.to_string(),
        symbols: stamped,
    }
    .encode()?;

    store.push(&claims)?;
    shared.sessions.broadcast(project, &payload, session);
    Ok(())
}

fn handle_full_sync(
    shared: &Arc<Shared>,
    session: SessionId,
    project: &str,
    since: Option<i64>,
) -> ServerResult<()> {
    let store = shared.stores.open(project)?;
    let latest = store.get_latest(None, since);
    let symbols: Vec<Symbol> = latest.iter().map(Claim::to_symbol).collect();

    let batch = Command::DownstreamSymbols {
        project: project.to_string(),
        symbols,
    };
    shared.sessions.send_to(session, batch.encode()?);

    let done = Command::FullSyncComplete {
        project: project.to_string(),
        timestamp: unix_timestamp_millis(),
    };
    shared.sessions.send_to(session, done.encode()?);
    Ok(())
}

/// Reads a bootstrap resource, refusing names that could leave the
/// resource directory.
fn read_resource(directory: &Path, name: &str) -> Option<Vec<u8>> {
    if name.is_empty() || name.contains(std::path::is_separator) || name.contains("..") {
        tracing::warn!(%name, "refusing resource name");
        return None;
    }
    std::fs::read(directory.join(name)).ok()
}
