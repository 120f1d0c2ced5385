//! Integration tests for Bluetooth output: keymap engine, Bluetooth sinks and
//! the transport multiplexer wired together the way `main` wires them.
//!
//! ```text
//! scans ──► KeymapEngine ──► BluetoothSink ──► queue ──► Multiplexer ──► MockPeer
//!                            (0xa1 framing)    (cap 1)   (interrupt)     (the host)
//! ```
//!
//! The L2CAP sockets are replaced by [`MockListener`]; each [`MockPeer`] is
//! the host's end of one accepted connection.  Because a host may connect
//! before or after a report is queued, and a fresh bridge discards whatever
//! frame was already waiting, the tests keep typing until the host sees the
//! frame they expect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ergoblue_core::report::frame_for_bluetooth;
use ergoblue_core::{
    ergoblue_keymap, HidKeyCode, HidReport, KeyMatrixEvent, Side, SystemCommand, KEYS_PER_HALF,
};

use ergoblue_control::application::device_registry::{Destination, DeviceRegistry, ReportSink};
use ergoblue_control::application::keymap_engine::{
    CommandError, KeymapEngine, SystemCommandRunner,
};
use ergoblue_control::infrastructure::output::bluetooth::BluetoothSink;
use ergoblue_control::infrastructure::output::mock::RecordingSink;
use ergoblue_control::infrastructure::storage::config::{ControllerConfig, TransportKind};
use ergoblue_control::infrastructure::transport::address::BdAddr;
use ergoblue_control::infrastructure::transport::mock::{MockAcceptor, MockListener, MockPeer};
use ergoblue_control::infrastructure::transport::multiplexer::{
    Channel, Multiplexer, RouteTable, TemporaryReset,
};

/// Address of the `def123` host in the default configuration.
const DEF123: BdAddr = BdAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
/// A host that was never provisioned.
const STRANGER: BdAddr = BdAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Short enough that reports to absent hosts are dropped quickly.
const SINK_DEADLINE: Duration = Duration::from_millis(20);
const SOCKET_TIMEOUT: Duration = Duration::from_millis(200);

struct NoCommands;

#[async_trait]
impl SystemCommandRunner for NoCommands {
    async fn run(&self, command: SystemCommand) -> Result<(), CommandError> {
        Err(CommandError::NotConfigured(command))
    }
}

// ── Fixture ───────────────────────────────────────────────────────────────────

struct Fixture {
    engine: KeymapEngine,
    acceptor: MockAcceptor,
}

impl Fixture {
    /// Default destinations: Bluetooth ones get real sinks routed through a
    /// multiplexer serving the interrupt channel; the rest record.
    fn start() -> Self {
        let config = ControllerConfig::default();
        let reset = TemporaryReset::new();
        let mut registry = DeviceRegistry::new();
        let mut routes = RouteTable::new();

        for entry in &config.destinations {
            let sink: Arc<dyn ReportSink> = match entry.transport {
                TransportKind::Bluetooth => {
                    let (sink, queue) = BluetoothSink::with_queue(SINK_DEADLINE);
                    match entry.bd_addr().expect("default addresses parse") {
                        Some(addr) => routes.add(addr, queue),
                        None => routes.set_temporary(queue),
                    }
                    Arc::new(sink)
                }
                TransportKind::Gadget | TransportKind::Uinput => Arc::new(RecordingSink::new()),
            };
            registry
                .register(Destination::new(
                    entry.id.clone(),
                    entry.platform,
                    entry.alternate_layout,
                    sink,
                ))
                .expect("default ids are unique");
        }

        let (listener, acceptor) = MockListener::new();
        let mux = Multiplexer::new(routes, reset.clone(), SOCKET_TIMEOUT);
        tokio::spawn(async move { mux.serve(listener, Channel::Interrupt).await });

        let engine = KeymapEngine::new(
            Arc::new(ergoblue_keymap().expect("built-in keymap")),
            registry,
            &config.controller.default_destination,
            Arc::new(NoCommands),
            Arc::new(reset),
        )
        .expect("default configuration matches the built-in keymap");

        Self { engine, acceptor }
    }

    async fn tap(&mut self, position: usize) {
        let side = if position < KEYS_PER_HALF {
            Side::Left
        } else {
            Side::Right
        };
        let pressed = scan_pressing(&[position], side);
        let released = scan_pressing(&[], side);
        for raw in [pressed, released] {
            self.engine
                .handle_event(&KeyMatrixEvent::new(raw, side))
                .await
                .expect("Bluetooth delivery problems are not fatal");
        }
    }

    /// Function layer, then the device key at `position`.
    async fn switch_with(&mut self, position: usize) {
        self.tap(75).await;
        self.tap(position).await;
    }

    /// Taps `position` until `peer` receives `expected`.
    async fn type_until_received(
        &mut self,
        position: usize,
        peer: &mut MockPeer,
        expected: &[u8],
    ) -> bool {
        for _ in 0..100 {
            self.tap(position).await;
            while let Ok(Some(frame)) =
                tokio::time::timeout(Duration::from_millis(10), peer.next_frame()).await
            {
                if frame == expected {
                    return true;
                }
            }
        }
        false
    }
}

/// Raw scan in which exactly `positions` are down.
fn scan_pressing(positions: &[usize], side: Side) -> [u8; 8] {
    let mut value: u64 = 0;
    for &position in positions {
        let bit = (0..56)
            .find(|bit| {
                let raw = (1u64 << (bit + 8)).to_le_bytes();
                KeyMatrixEvent::new(raw, side).decode().is_pressed(position)
            })
            .expect("every position has a matrix bit");
        value |= 1 << (bit + 8);
    }
    value.to_le_bytes()
}

fn framed(keys: &[HidKeyCode]) -> Vec<u8> {
    frame_for_bluetooth(&HidReport::desktop(0, keys).encode())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_provisioned_host_receives_framed_keystrokes() {
    // Arrange
    let mut fx = Fixture::start();
    let mut host = fx.acceptor.connect(DEF123);
    fx.switch_with(2).await;

    // Act / Assert: def123 uses the alternate layout, so Colemak `e` is K
    assert!(
        fx.type_until_received(54, &mut host, &framed(&[HidKeyCode::KeyK]))
            .await
    );
}

#[tokio::test]
async fn test_typing_without_connected_host_is_not_fatal() {
    // Arrange: ghi123 is Bluetooth but nobody connects
    let mut fx = Fixture::start();
    fx.switch_with(3).await;

    // Act: every write after the first waits out the sink deadline
    fx.tap(15).await;
    fx.tap(15).await;

    // Assert
    assert_eq!(fx.engine.session().device, "ghi123");
}

#[tokio::test]
async fn test_unknown_host_types_through_temporary_destination() {
    // Arrange
    let mut fx = Fixture::start();
    let mut stranger = fx.acceptor.connect(STRANGER);
    fx.switch_with(35).await;

    // Act / Assert: tmp123 is a plain QWERTY macOS host
    assert!(
        fx.type_until_received(15, &mut stranger, &framed(&[HidKeyCode::KeyA]))
            .await
    );
}

#[tokio::test]
async fn test_reset_key_disconnects_temporary_host() {
    // Arrange: the stranger is bridged once a frame reaches it
    let mut fx = Fixture::start();
    let mut stranger = fx.acceptor.connect(STRANGER);
    fx.switch_with(35).await;
    assert!(
        fx.type_until_received(15, &mut stranger, &framed(&[HidKeyCode::KeyA]))
            .await
    );

    // Act: function layer, reset key
    fx.tap(75).await;
    fx.tap(34).await;

    // Assert
    let closed = tokio::time::timeout(Duration::from_secs(1), stranger.closed()).await;
    assert!(closed.is_ok(), "temporary connection should be dropped");
}

#[tokio::test]
async fn test_reset_key_keeps_provisioned_host_connected() {
    // Arrange
    let mut fx = Fixture::start();
    let mut host = fx.acceptor.connect(DEF123);
    fx.switch_with(2).await;
    assert!(
        fx.type_until_received(54, &mut host, &framed(&[HidKeyCode::KeyK]))
            .await
    );

    // Act
    fx.tap(75).await;
    fx.tap(34).await;

    // Assert: the same connection still carries keystrokes
    assert!(
        fx.type_until_received(15, &mut host, &framed(&[HidKeyCode::KeyA]))
            .await
    );
}
