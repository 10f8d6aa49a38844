//! The connection seam between the workflows and the broker.

use crate::error::{ClientError, ClientResult};
use crate::spec::ConnectSpec;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use symsync_protocol::{read_frame, write_frame, write_handshake, Command};

/// A framed, bidirectional channel to the broker.
///
/// Implementations carry whole frames; the workflows never see partial
/// reads. All methods take `&self` so one connection can be shared
/// between a blocking inbound listener and event-driven uploaders.
pub trait Connection: Send + Sync {
    /// Sends one framed payload.
    fn send(&self, payload: &[u8]) -> ClientResult<()>;

    /// Receives one framed payload, blocking until a frame arrives or the
    /// connection dies.
    fn recv(&self) -> ClientResult<Vec<u8>>;

    /// Closes the connection. A `recv` blocked in another thread fails at
    /// its next read; the partially-read frame is discarded.
    fn close(&self) -> ClientResult<()>;

    /// Encodes and sends one command.
    fn send_command(&self, command: &Command) -> ClientResult<()> {
        self.send(&command.encode()?)
    }
}

/// A blocking TCP connection to the broker.
///
/// Reading and writing go through separate handles of the same socket, so
/// an upload never waits behind the inbound listener's blocking read.
pub struct TcpConnection {
    reader: Mutex<TcpStream>,
    writer: Mutex<TcpStream>,
}

impl TcpConnection {
    /// Connects to the broker and performs the name handshake.
    pub fn connect(spec: &ConnectSpec) -> ClientResult<Self> {
        let reader = TcpStream::connect((spec.host.as_str(), spec.port))?;
        let mut writer = reader.try_clone()?;
        write_handshake(&mut writer, &spec.name)?;
        tracing::info!(%spec, "connected");

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }
}

impl Connection for TcpConnection {
    fn send(&self, payload: &[u8]) -> ClientResult<()> {
        write_frame(&mut *self.writer.lock(), payload)?;
        Ok(())
    }

    fn recv(&self) -> ClientResult<Vec<u8>> {
        Ok(read_frame(&mut *self.reader.lock())?)
    }

    fn close(&self) -> ClientResult<()> {
        // Shut down through the writer handle: the reader lock may be held
        // by a blocked recv, which this is meant to interrupt.
        self.writer.lock().shutdown(Shutdown::Both)?;
        Ok(())
    }
}

/// A scripted in-memory connection for tests.
///
/// Outbound payloads are captured for inspection; inbound frames are
/// queued ahead of time and handed out in order. When the queue runs dry
/// `recv` reports the connection as closed, which ends a listener loop.
#[derive(Default)]
pub struct MockConnection {
    sent: Mutex<Vec<Vec<u8>>>,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    open: AtomicBool,
}

impl MockConnection {
    /// Creates an open connection with no scripted frames.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            open: AtomicBool::new(true),
        }
    }

    /// Queues a command for a later `recv`.
    pub fn script(&self, command: &Command) -> ClientResult<()> {
        self.inbound.lock().push_back(command.encode()?);
        Ok(())
    }

    /// Queues raw bytes for a later `recv`.
    pub fn script_payload(&self, payload: Vec<u8>) {
        self.inbound.lock().push_back(payload);
    }

    /// Every payload sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Every sent payload, decoded as a command.
    pub fn sent_commands(&self) -> ClientResult<Vec<Command>> {
        self.sent()
            .iter()
            .map(|payload| Ok(Command::decode(payload)?))
            .collect()
    }

    /// Forgets everything sent so far.
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }
}

impl Connection for MockConnection {
    fn send(&self, payload: &[u8]) -> ClientResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        self.sent.lock().push(payload.to_vec());
        Ok(())
    }

    fn recv(&self) -> ClientResult<Vec<u8>> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        self.inbound.lock().pop_front().ok_or(ClientError::Closed)
    }

    fn close(&self) -> ClientResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
