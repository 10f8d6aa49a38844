//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
pub use symsync_protocol::DEFAULT_PORT;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Directory holding the per-project claim ledgers.
    pub store_directory: PathBuf,
    /// Directory served through resource requests, if any.
    pub resource_directory: Option<PathBuf>,
}

impl ServerConfig {
    /// Creates a configuration with the default bind address.
    pub fn new(store_directory: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            store_directory: store_directory.into(),
            resource_directory: None,
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Enables resource serving from the given directory.
    #[must_use]
    pub fn with_resource_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.resource_directory = Some(directory.into());
        self
    }
}
