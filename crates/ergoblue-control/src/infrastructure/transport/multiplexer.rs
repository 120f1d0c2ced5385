//! Transport multiplexer: routes incoming L2CAP connections to destinations.
//!
//! A Bluetooth HID host opens two L2CAP channels to the keyboard: *control*
//! (PSM 17), which carries nothing we use but must stay open, and
//! *interrupt* (PSM 19), which carries the report stream.  The multiplexer
//! accepts both and decides, per connection, which destination's frame
//! queue the connection serves.
//!
//! # Routing (for beginners)
//!
//! ```text
//! accept() ──► peer address
//!                 │
//!     ┌───────────┴────────────┐
//!  provisioned?             unknown
//!     │                        │
//!  per-address slot       shared temporary slot (try-acquire)
//!     │                        │  busy? ──► close immediately
//!     ▼                        ▼
//!  bridge until            bridge until the peer hangs up
//!  the peer hangs up       OR the reset signal fires
//! ```
//!
//! Slots are single-permit [`Semaphore`]s; the permit is owned by the
//! bridge task and released exactly once, when that task ends.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, trace, warn};

use super::address::BdAddr;
use crate::application::keymap_engine::TemporaryConnections;
use crate::infrastructure::output::bluetooth::FrameReceiver;

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Large enough for any packet a host sends on either channel.
const INBOUND_BUFFER_LEN: usize = 1024;

/// Error type for the Bluetooth transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listener will not produce further connections.
    #[error("listener closed")]
    Closed,

    /// A socket operation failed.
    #[error("{operation} failed on PSM {psm}: {source}")]
    Socket {
        operation: &'static str,
        psm: u16,
        #[source]
        source: io::Error,
    },
}

/// One accepted connection.
#[async_trait]
pub trait PeerConnection: Send + Sync + 'static {
    /// Receives one packet; `Ok(0)` means the peer disconnected.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Sends one packet.
    async fn send(&self, frame: &[u8]) -> io::Result<usize>;
}

/// Source of incoming connections on one PSM.
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    type Connection: PeerConnection;

    /// Waits for the next connection and its peer's address.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] ends serving; any other error is logged
    /// and accepting continues.
    async fn accept(&self) -> Result<(Self::Connection, BdAddr), TransportError>;
}

/// Which of the two HID channels a listener serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Kept open for the host; data-less.
    Control,
    /// Relays the destination's report frames.
    Interrupt,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Control => f.write_str("control"),
            Channel::Interrupt => f.write_str("interrupt"),
        }
    }
}

/// A destination's frame queue, shared by the bridges that may serve it.
pub type SharedQueue = Arc<Mutex<FrameReceiver>>;

/// Which queue a peer address is bridged to.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<BdAddr, SharedQueue>,
    temporary: Option<SharedQueue>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes connections from `addr` to `queue`.
    pub fn add(&mut self, addr: BdAddr, queue: FrameReceiver) {
        self.routes.insert(addr, Arc::new(Mutex::new(queue)));
    }

    /// Routes connections from unknown addresses to `queue`.
    pub fn set_temporary(&mut self, queue: FrameReceiver) {
        self.temporary = Some(Arc::new(Mutex::new(queue)));
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.temporary.is_none()
    }

    fn queue_for(&self, addr: &BdAddr) -> Option<SharedQueue> {
        self.routes.get(addr).cloned()
    }
}

/// Signal that drops every connection holding a temporary slot.
#[derive(Debug, Clone, Default)]
pub struct TemporaryReset {
    notify: Arc<Notify>,
}

impl TemporaryReset {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemporaryConnections for TemporaryReset {
    fn reset(&self) {
        self.notify.notify_waiters();
    }
}

/// Accepts connections and bridges them to destination queues.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    routes: Arc<RouteTable>,
    reset: TemporaryReset,
    write_timeout: Duration,
}

impl Multiplexer {
    pub fn new(routes: RouteTable, reset: TemporaryReset, write_timeout: Duration) -> Self {
        Self {
            routes: Arc::new(routes),
            reset,
            write_timeout,
        }
    }

    /// Accepts connections from `listener` until it closes.
    ///
    /// Each accepted connection is handled on its own task.  Slots are
    /// per call, so the control and interrupt listeners admit one
    /// connection each per address.
    pub async fn serve<L: ConnectionListener>(&self, listener: L, channel: Channel) {
        let slots: HashMap<BdAddr, Arc<Semaphore>> = self
            .routes
            .routes
            .keys()
            .map(|addr| (*addr, Arc::new(Semaphore::new(1))))
            .collect();
        let temporary_slot = Arc::new(Semaphore::new(1));

        info!(%channel, "accepting Bluetooth connections");
        loop {
            let (conn, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(TransportError::Closed) => {
                    info!(%channel, "listener closed");
                    return;
                }
                Err(e) => {
                    warn!(%channel, error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            if let Some(slot) = slots.get(&peer) {
                let Ok(permit) = Arc::clone(slot).try_acquire_owned() else {
                    debug!(%channel, %peer, "peer already connected; closing duplicate");
                    continue;
                };
                info!(%channel, %peer, "provisioned host connected");
                let queue = self.routes.queue_for(&peer);
                let write_timeout = self.write_timeout;
                tokio::spawn(async move {
                    bridge(&conn, peer, channel, queue.as_ref(), write_timeout).await;
                    info!(%channel, %peer, "provisioned host disconnected");
                    drop(permit);
                });
                continue;
            }

            let Some(queue) = self.routes.temporary.clone() else {
                debug!(%channel, %peer, "unknown peer and no temporary destination; closing");
                continue;
            };
            let Ok(permit) = Arc::clone(&temporary_slot).try_acquire_owned() else {
                debug!(%channel, %peer, "temporary slot in use; closing");
                continue;
            };
            info!(%channel, %peer, "unknown host took the temporary slot");
            tokio::spawn(bridge_temporary(
                conn,
                peer,
                channel,
                queue,
                self.write_timeout,
                Arc::clone(&self.reset.notify),
                permit,
            ));
        }
    }
}

async fn bridge_temporary<C: PeerConnection>(
    conn: C,
    peer: BdAddr,
    channel: Channel,
    queue: SharedQueue,
    write_timeout: Duration,
    reset: Arc<Notify>,
    permit: OwnedSemaphorePermit,
) {
    let notified = reset.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();

    tokio::select! {
        _ = bridge(&conn, peer, channel, Some(&queue), write_timeout) => {
            info!(%channel, %peer, "temporary host disconnected");
        }
        _ = &mut notified => {
            info!(%channel, %peer, "temporary connection reset");
        }
    }
    drop(conn);
    drop(permit);
}

/// Serves one connection until the peer goes away.
async fn bridge<C: PeerConnection>(
    conn: &C,
    peer: BdAddr,
    channel: Channel,
    queue: Option<&SharedQueue>,
    write_timeout: Duration,
) {
    match (channel, queue) {
        (Channel::Interrupt, Some(queue)) => relay(conn, peer, queue, write_timeout).await,
        _ => hold_open(conn, peer).await,
    }
}

/// Reads and discards until the peer disconnects.
async fn hold_open<C: PeerConnection>(conn: &C, peer: BdAddr) {
    let mut buf = [0u8; INBOUND_BUFFER_LEN];
    loop {
        match conn.recv(&mut buf).await {
            Ok(0) => return,
            Ok(n) => trace!(%peer, n, "ignoring inbound packet"),
            Err(e) => {
                debug!(%peer, error = %e, "read failed");
                return;
            }
        }
    }
}

/// Writes queued frames to the peer while watching for disconnect.
async fn relay<C: PeerConnection>(
    conn: &C,
    peer: BdAddr,
    queue: &SharedQueue,
    write_timeout: Duration,
) {
    let mut frames = queue.lock().await;

    // Reports typed while nobody was connected are out of date.
    let mut stale = 0usize;
    while frames.try_recv().is_ok() {
        stale += 1;
    }
    if stale > 0 {
        debug!(%peer, stale, "discarded frames queued before connect");
    }

    let mut buf = [0u8; INBOUND_BUFFER_LEN];
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    debug!(%peer, "destination queue closed");
                    return;
                };
                match tokio::time::timeout(write_timeout, conn.send(&frame)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => debug!(%peer, error = %e, "frame dropped"),
                    Err(_elapsed) => trace!(%peer, "frame dropped after write timeout"),
                }
            }
            read = conn.recv(&mut buf) => match read {
                Ok(0) => return,
                Ok(n) => trace!(%peer, n, "ignoring inbound packet"),
                Err(e) => {
                    debug!(%peer, error = %e, "read failed");
                    return;
                }
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_registry::ReportSink;
    use crate::infrastructure::output::bluetooth::BluetoothSink;
    use crate::infrastructure::transport::mock::{MockAcceptor, MockListener, MockPeer};

    const KNOWN: BdAddr = BdAddr([0xDC, 0xA6, 0x32, 0x00, 0x00, 0x01]);
    const STRANGER_1: BdAddr = BdAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    const STRANGER_2: BdAddr = BdAddr([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    const REPORT: [u8; 8] = [0x01, 0x00, 0x04, 0, 0, 0, 0, 0];

    struct Fixture {
        known: BluetoothSink,
        temporary: BluetoothSink,
        reset: TemporaryReset,
        acceptor: MockAcceptor,
    }

    fn start(channel: Channel) -> Fixture {
        let deadline = Duration::from_millis(5);
        let (known, known_rx) = BluetoothSink::with_queue(deadline);
        let (temporary, temporary_rx) = BluetoothSink::with_queue(deadline);
        let mut routes = RouteTable::new();
        routes.add(KNOWN, known_rx);
        routes.set_temporary(temporary_rx);
        let reset = TemporaryReset::new();
        let mux = Multiplexer::new(routes, reset.clone(), Duration::from_millis(5));
        let (listener, acceptor) = MockListener::new();
        tokio::spawn(async move { mux.serve(listener, channel).await });
        Fixture {
            known,
            temporary,
            reset,
            acceptor,
        }
    }

    /// Writes through `sink` until `peer` receives a frame.  Frames written
    /// before the bridge starts are discarded as stale, hence the retries.
    async fn deliver(sink: &BluetoothSink, peer: &mut MockPeer) -> Option<Vec<u8>> {
        for _ in 0..200 {
            let _ = sink.write(&REPORT).await;
            if let Ok(Some(frame)) =
                tokio::time::timeout(Duration::from_millis(10), peer.next_frame()).await
            {
                return Some(frame);
            }
        }
        None
    }

    async fn closed_within(peer: &mut MockPeer, limit: Duration) -> bool {
        tokio::time::timeout(limit, peer.closed()).await.is_ok()
    }

    #[tokio::test]
    async fn test_provisioned_host_receives_framed_reports() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut peer = fx.acceptor.connect(KNOWN);

        // Act
        let frame = deliver(&fx.known, &mut peer).await;

        // Assert
        let mut expected = vec![0xa1];
        expected.extend_from_slice(&REPORT);
        assert_eq!(frame, Some(expected));
    }

    #[tokio::test]
    async fn test_second_unknown_peer_is_dropped_while_first_keeps_bridging() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut first = fx.acceptor.connect(STRANGER_1);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());

        // Act
        let mut second = fx.acceptor.connect(STRANGER_2);

        // Assert
        assert!(closed_within(&mut second, Duration::from_secs(2)).await);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());
    }

    #[tokio::test]
    async fn test_same_unknown_address_twice_is_dropped() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut first = fx.acceptor.connect(STRANGER_1);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());

        // Act
        let mut again = fx.acceptor.connect(STRANGER_1);

        // Assert
        assert!(closed_within(&mut again, Duration::from_secs(2)).await);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());
    }

    #[tokio::test]
    async fn test_reset_closes_temporary_connection_and_frees_slot() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut first = fx.acceptor.connect(STRANGER_1);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());

        // Act
        fx.reset.reset();

        // Assert
        assert!(closed_within(&mut first, Duration::from_secs(2)).await);
        let mut second = fx.acceptor.connect(STRANGER_2);
        assert!(deliver(&fx.temporary, &mut second).await.is_some());
    }

    #[tokio::test]
    async fn test_reset_leaves_provisioned_connections_alone() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut known = fx.acceptor.connect(KNOWN);
        assert!(deliver(&fx.known, &mut known).await.is_some());

        // Act
        fx.reset.reset();

        // Assert
        assert!(deliver(&fx.known, &mut known).await.is_some());
    }

    #[tokio::test]
    async fn test_provisioned_host_connects_while_temporary_slot_is_busy() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut stranger = fx.acceptor.connect(STRANGER_1);
        assert!(deliver(&fx.temporary, &mut stranger).await.is_some());

        // Act
        let mut known = fx.acceptor.connect(KNOWN);

        // Assert
        assert!(deliver(&fx.known, &mut known).await.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_frees_the_temporary_slot() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut first = fx.acceptor.connect(STRANGER_1);
        assert!(deliver(&fx.temporary, &mut first).await.is_some());

        // Act
        first.hang_up();
        assert!(closed_within(&mut first, Duration::from_secs(2)).await);
        let mut second = fx.acceptor.connect(STRANGER_2);

        // Assert
        assert!(deliver(&fx.temporary, &mut second).await.is_some());
    }

    #[tokio::test]
    async fn test_inbound_packets_do_not_end_the_bridge() {
        // Arrange
        let fx = start(Channel::Interrupt);
        let mut known = fx.acceptor.connect(KNOWN);
        assert!(deliver(&fx.known, &mut known).await.is_some());

        // Act: the host sets its LEDs
        known.send(&[0xa2, 0x01, 0x02]);

        // Assert
        assert!(deliver(&fx.known, &mut known).await.is_some());
    }

    #[tokio::test]
    async fn test_control_channel_stays_open_until_peer_hangs_up() {
        // Arrange
        let fx = start(Channel::Control);
        let mut peer = fx.acceptor.connect(KNOWN);

        // Act
        let closed_early = closed_within(&mut peer, Duration::from_millis(50)).await;
        peer.hang_up();

        // Assert
        assert!(!closed_early);
        assert!(closed_within(&mut peer, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_control_channel_never_carries_reports() {
        // Arrange
        let fx = start(Channel::Control);
        let mut peer = fx.acceptor.connect(KNOWN);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Act
        let _ = fx.known.write(&REPORT).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Assert
        assert!(peer.try_frame().is_err());
    }

    #[tokio::test]
    async fn test_unknown_peer_without_temporary_destination_is_dropped() {
        // Arrange
        let mux = Multiplexer::new(
            RouteTable::new(),
            TemporaryReset::new(),
            Duration::from_millis(5),
        );
        let (listener, acceptor) = MockListener::new();
        tokio::spawn(async move { mux.serve(listener, Channel::Interrupt).await });

        // Act
        let mut peer = acceptor.connect(STRANGER_1);

        // Assert
        assert!(closed_within(&mut peer, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_serve_returns_when_listener_closes() {
        // Arrange
        let mux = Multiplexer::new(
            RouteTable::new(),
            TemporaryReset::new(),
            Duration::from_millis(5),
        );
        let (listener, acceptor) = MockListener::new();
        drop(acceptor);

        // Act / Assert
        tokio::time::timeout(Duration::from_secs(2), mux.serve(listener, Channel::Control))
            .await
            .expect("serve returns");
    }
}
