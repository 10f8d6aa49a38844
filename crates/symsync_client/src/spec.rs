//! Connection settings parsed from a `name@host:port` string.

use crate::error::{ClientError, ClientResult};
use std::fmt;
use std::str::FromStr;
use symsync_protocol::DEFAULT_PORT;

/// Where and as whom to connect.
///
/// The textual form `name@host:port` is what connection dialogs collect
/// and what gets persisted as the last-used value; `Display` round-trips
/// it. The port may be omitted and defaults to the broker's standard
/// port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSpec {
    /// Self-declared display name sent in the handshake.
    pub name: String,
    /// Broker host name or address.
    pub host: String,
    /// Broker TCP port.
    pub port: u16,
}

impl ConnectSpec {
    /// Creates a spec with the default port.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl FromStr for ConnectSpec {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        // The name may itself contain '@'; the host:port part never does.
        let (name, rest) = s
            .rsplit_once('@')
            .ok_or_else(|| ClientError::InvalidSpec(s.to_string()))?;

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| ClientError::InvalidSpec(s.to_string()))?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if name.is_empty() || host.is_empty() {
            return Err(ClientError::InvalidSpec(s.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ConnectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.host, self.port)
    }
}
