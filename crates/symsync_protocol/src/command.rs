//! The command catalog exchanged between client and server.

use crate::error::{ProtocolError, ProtocolResult};
use crate::symbol::{ProjectId, Symbol};
use serde::{Deserialize, Serialize};

/// A protocol command.
///
/// Commands travel as CBOR maps with a single outer tag naming the variant.
/// The catalog is closed: decoding a payload with an unrecognized tag fails
/// with [`ProtocolError::Decode`] rather than skipping the frame silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Start receiving updates for a project.
    Subscribe {
        /// Project to subscribe to.
        project: ProjectId,
    },

    /// Stop receiving updates for a project. A no-op if not subscribed.
    Unsubscribe {
        /// Project to unsubscribe from.
        project: ProjectId,
    },

    /// Report local claims to the server.
    UpstreamSymbols {
        /// Project the claims belong to.
        project: ProjectId,
        /// The claims themselves.
        symbols: Vec<Symbol>,
        /// Whether the server should log each claim individually.
        loggable: bool,
    },

    /// Deliver claims made by other collaborators, or a full-sync batch.
    DownstreamSymbols {
        /// Project the claims belong to.
        project: ProjectId,
        /// The claims themselves.
        symbols: Vec<Symbol>,
    },

    /// Request the authoritative latest-per-signature view of a project.
    FullSyncRequest {
        /// Project to sync.
        project: ProjectId,
        /// If set, only claims strictly newer than this are wanted.
        since: Option<i64>,
    },

    /// Marks the end of a full sync and carries the server clock the client
    /// should remember for its next incremental request.
    FullSyncComplete {
        /// Project that finished syncing.
        project: ProjectId,
        /// Server time, unix milliseconds.
        timestamp: i64,
    },

    /// Request a bootstrap resource by name.
    ResourceRequest {
        /// Resource file name.
        name: String,
    },

    /// Resource content, or `None` if the server does not have it.
    ResourceResponse {
        /// Resource file name.
        name: String,
        /// Raw resource bytes if available.
        content: Option<Vec<u8>>,
    },
}

impl Command {
    /// Encodes the command to CBOR bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a command from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use proptest::prelude::*;

    fn sample_symbol() -> Symbol {
        Symbol::new(SymbolKind::Method, "Lcom/app/Main;->run()V")
            .named("start")
            .timestamped(1_700_000_000_000)
            .authored("alice")
    }

    #[test]
    fn roundtrip_every_variant() {
        let tombstone = Symbol::new(SymbolKind::Field, "Lcom/app/Main;->count:I")
            .timestamped(1_700_000_000_001)
            .authored("bob");

        let commands = vec![
            Command::Subscribe {
                project: "p1".into(),
            },
            Command::Unsubscribe {
                project: "p1".into(),
            },
            Command::UpstreamSymbols {
                project: "p1".into(),
                symbols: vec![sample_symbol(), tombstone.clone()],
                loggable: true,
            },
            Command::DownstreamSymbols {
                project: "p1".into(),
                symbols: vec![tombstone],
            },
            Command::FullSyncRequest {
                project: "p1".into(),
                since: Some(42),
            },
            Command::FullSyncRequest {
                project: "p1".into(),
                since: None,
            },
            Command::FullSyncComplete {
                project: "p1".into(),
                timestamp: 1_700_000_000_002,
            },
            Command::ResourceRequest {
                name: "driver.jar".into(),
            },
            Command::ResourceResponse {
                name: "driver.jar".into(),
                content: Some(vec![0xca, 0xfe]),
            },
            Command::ResourceResponse {
                name: "missing.jar".into(),
                content: None,
            },
        ];

        for command in commands {
            let bytes = command.encode().unwrap();
            let decoded = Command::decode(&bytes).unwrap();
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        // A map with a variant tag that is not part of the catalog.
        #[derive(Serialize)]
        enum Bogus {
            Hijack { project: String },
        }

        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&Bogus::Hijack { project: "p".into() }, &mut bytes).unwrap();

        let err = Command::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Command::decode(&[0xff, 0x00, 0x13, 0x37]).is_err());
    }

    proptest! {
        #[test]
        fn upstream_roundtrip(
            project in "[a-f0-9]{8}",
            signature in ".{1,64}",
            name in proptest::option::of(".{0,32}"),
            timestamp in proptest::option::of(any::<i64>()),
            loggable in any::<bool>(),
            code in 0u8..=2,
        ) {
            let symbol = Symbol {
                kind: SymbolKind::from_code(code).unwrap(),
                canonical_signature: signature,
                name,
                timestamp,
                author: None,
            };
            let command = Command::UpstreamSymbols {
                project,
                symbols: vec![symbol],
                loggable,
            };

            let decoded = Command::decode(&command.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, command);
        }
    }
}
