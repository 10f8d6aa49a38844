//! Continuous download and application of remote claims.

use crate::connection::Connection;
use crate::error::ClientResult;
use std::sync::Arc;
use symsync_engine::{HostModel, RenameEngine};
use symsync_protocol::{Command, ProjectId};

/// Subscribes to a project and requests its latest view.
///
/// The full-sync request carries the cursor from the previous session's
/// `FullSyncComplete`, so a reconnecting client only transfers claims it
/// has not seen yet.
pub fn announce<M: HostModel, C: Connection>(
    connection: &C,
    engine: &RenameEngine<M>,
    project: &str,
) -> ClientResult<()> {
    connection.send_command(&Command::Subscribe {
        project: project.to_string(),
    })?;
    connection.send_command(&Command::FullSyncRequest {
        project: project.to_string(),
        since: engine.last_sync(project)?,
    })?;
    Ok(())
}

/// Feeds inbound frames into the rename engine.
///
/// Runs on its own thread and blocks in `recv`; tearing the session down
/// means closing the connection, which fails that read and ends the loop.
pub struct UpdateListener<M: HostModel, C: Connection> {
    connection: Arc<C>,
    engine: Arc<RenameEngine<M>>,
    projects: Vec<ProjectId>,
}

impl<M: HostModel, C: Connection> UpdateListener<M, C> {
    /// Creates the listener for the given subscribed projects.
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

    /// Receives and handles frames until the connection dies.
    pub fn run(&self) -> ClientResult<()> {
        loop {
            let payload = match self.connection.recv() {
                Ok(payload) => payload,
                Err(error) => {
                    if error.is_disconnect() {
                        tracing::info!("update listener stopped");
                        return Ok(());
                    }
                    return Err(error);
                }
            };

            // An undecodable frame aborts that frame only; the stream is
            // still framed correctly.
            let command = match Command::decode(&payload) {
                Ok(command) => command,
                Err(error) => {
                    tracing::warn!(%error, "dropping undecodable frame");
                    continue;
                }
            };
            self.handle(command)?;
        }
    }

    /// Handles one decoded inbound command.
    pub fn handle(&self, command: Command) -> ClientResult<()> {
        match command {
            Command::DownstreamSymbols { project, symbols } => {
                if !self.projects.contains(&project) {
                    return Ok(());
                }
                tracing::debug!(%project, count = symbols.len(), "applying remote claims");
                // Record everything first so a burst coalesces into one
                // flush per signature.
                self.engine.record(&project, &symbols, true)?;
                self.engine.flush_all()?;
            }
            Command::FullSyncComplete { project, timestamp } => {
                if self.projects.contains(&project) {
                    self.engine.set_last_sync(&project, timestamp)?;
                }
            }
            other => {
                tracing::debug!(?other, "ignoring unexpected inbound command");
            }
        }
        Ok(())
    }
}
