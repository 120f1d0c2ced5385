//! In-memory L2CAP stand-ins for tests.
//!
//! [`MockListener`] yields whatever connections the test pushes through its
//! [`MockAcceptor`].  Each [`MockConnection`] is paired with a [`MockPeer`],
//! the test's view of the remote host: it can send inbound packets, read
//! the frames the controller wrote, hang up, and observe when the
//! controller closed the connection.

use std::io;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::address::BdAddr;
use super::multiplexer::{ConnectionListener, PeerConnection, TransportError};

/// Controller side of an in-memory connection.
#[derive(Debug)]
pub struct MockConnection {
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

/// Remote side of an in-memory connection.
#[derive(Debug)]
pub struct MockPeer {
    inbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Creates a connected pair.
pub fn connection_pair() -> (MockConnection, MockPeer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    (
        MockConnection {
            inbound: Mutex::new(in_rx),
            outbound: out_tx,
        },
        MockPeer {
            inbound: Some(in_tx),
            outbound: out_rx,
        },
    )
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.lock().await.recv().await {
            Some(packet) => {
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    async fn send(&self, frame: &[u8]) -> io::Result<usize> {
        self.outbound
            .send(frame.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(frame.len())
    }
}

impl MockPeer {
    /// Sends a packet to the controller (e.g. an LED output report).
    pub fn send(&self, packet: &[u8]) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(packet.to_vec());
        }
    }

    /// Next frame the controller wrote, or `None` once it closed the
    /// connection.
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.outbound.recv().await
    }

    /// A frame already written, without waiting.
    pub fn try_frame(&mut self) -> Result<Vec<u8>, mpsc::error::TryRecvError> {
        self.outbound.try_recv()
    }

    /// Closes the remote end; the controller's next read returns 0.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Waits until the controller has dropped its side of the connection,
    /// discarding any frames still in flight.
    pub async fn closed(&mut self) {
        while self.outbound.recv().await.is_some() {}
    }
}

/// A listener fed by the test.
#[derive(Debug)]
pub struct MockListener {
    incoming: Mutex<mpsc::UnboundedReceiver<(MockConnection, BdAddr)>>,
}

/// Test handle that "dials" a [`MockListener`].
#[derive(Debug, Clone)]
pub struct MockAcceptor {
    incoming: mpsc::UnboundedSender<(MockConnection, BdAddr)>,
}

impl MockListener {
    pub fn new() -> (Self, MockAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                incoming: Mutex::new(rx),
            },
            MockAcceptor { incoming: tx },
        )
    }
}

impl MockAcceptor {
    /// Opens a connection from `addr` and returns the remote end.
    pub fn connect(&self, addr: BdAddr) -> MockPeer {
        let (conn, peer) = connection_pair();
        let _ = self.incoming.send((conn, addr));
        peer
    }
}

#[async_trait]
impl ConnectionListener for MockListener {
    type Connection = MockConnection;

    async fn accept(&self) -> Result<(MockConnection, BdAddr), TransportError> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }
}
