//! Integration tests for the keymap engine driven by the built-in keymap.
//!
//! These tests exercise the full path from raw matrix scans to HID reports
//! without any hardware:
//!
//! ```text
//! MockHalf ──► InputPipeline ──► KeymapEngine ──► RecordingSink
//!   (8-byte scans)     (KeyMatrixEvent)      (HID reports per destination)
//! ```
//!
//! Every destination of the default configuration is registered with a
//! [`RecordingSink`], so a test can assert on exactly which host received
//! which report.  The system command runner and the temporary-connection
//! reset are replaced by counting doubles.
//!
//! # Key positions used (built-in keymap)
//!
//! | Position | Layer 0        | Layer 1 (functions) | Layer 2 (symbols) |
//! |----------|----------------|---------------------|-------------------|
//! | 0        | –              | –                   | power off         |
//! | 2        | `2`            | switch to `def123`  | –                 |
//! | 15       | `a`            | F5                  | –                 |
//! | 20       | layer 2 (once) | –                   | –                 |
//! | 34       | –              | reset temporary     | –                 |
//! | 54       | `e` (Colemak)  | F18                 | –                 |
//! | 75       | layer 1 (once) | –                   | –                 |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ergoblue_core::{
    ergoblue_keymap, HidKeyCode, HidReport, KeyMatrixEvent, Platform, Side, SystemCommand,
    KEYS_PER_HALF,
};
use tokio::sync::mpsc;

use ergoblue_control::application::device_registry::{Destination, DeviceRegistry, ReportSink};
use ergoblue_control::application::input_pipeline::InputPipeline;
use ergoblue_control::application::keymap_engine::{
    CommandError, EngineError, KeymapEngine, SystemCommandRunner, TemporaryConnections,
};
use ergoblue_control::infrastructure::input_source::mock::MockHalf;
use ergoblue_control::infrastructure::output::mock::RecordingSink;
use ergoblue_control::infrastructure::storage::config::ControllerConfig;

const LEFT_ADDRESS: &str = "00:00:00:00:00:0a";
const RIGHT_ADDRESS: &str = "00:00:00:00:00:0b";

// ── Test doubles ──────────────────────────────────────────────────────────────

/// Records the commands it was asked to run; optionally fails them.
#[derive(Default)]
struct RecordingCommands {
    runs: Mutex<Vec<SystemCommand>>,
    fail: bool,
}

#[async_trait]
impl SystemCommandRunner for RecordingCommands {
    async fn run(&self, command: SystemCommand) -> Result<(), CommandError> {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(command);
        if self.fail {
            return Err(CommandError::NotConfigured(command));
        }
        Ok(())
    }
}

#[derive(Default)]
struct CountingReset {
    resets: AtomicUsize,
}

impl TemporaryConnections for CountingReset {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Fixture ───────────────────────────────────────────────────────────────────

struct Fixture {
    engine: KeymapEngine,
    sinks: Vec<(String, Arc<RecordingSink>)>,
    commands: Arc<RecordingCommands>,
    reset: Arc<CountingReset>,
}

impl Fixture {
    /// Every default destination, each backed by a recording sink.
    fn new(commands: RecordingCommands) -> Self {
        let config = ControllerConfig::default();
        let mut registry = DeviceRegistry::new();
        let mut sinks = Vec::new();
        for entry in &config.destinations {
            let sink = Arc::new(RecordingSink::new());
            registry
                .register(Destination::new(
                    entry.id.clone(),
                    entry.platform,
                    entry.alternate_layout,
                    Arc::clone(&sink) as Arc<dyn ReportSink>,
                ))
                .expect("default ids are unique");
            sinks.push((entry.id.clone(), sink));
        }

        let commands = Arc::new(commands);
        let reset = Arc::new(CountingReset::default());
        let engine = KeymapEngine::new(
            Arc::new(ergoblue_keymap().expect("built-in keymap")),
            registry,
            &config.controller.default_destination,
            Arc::clone(&commands) as Arc<dyn SystemCommandRunner>,
            Arc::clone(&reset) as Arc<dyn TemporaryConnections>,
        )
        .expect("default configuration matches the built-in keymap");

        Self {
            engine,
            sinks,
            commands,
            reset,
        }
    }

    fn sink(&self, id: &str) -> Arc<RecordingSink> {
        self.sinks
            .iter()
            .find(|(sink_id, _)| sink_id == id)
            .map(|(_, sink)| Arc::clone(sink))
            .expect("destination is registered")
    }

    /// Presses and releases `position` as two scans from its half.
    async fn tap(&mut self, position: usize) -> Result<(), EngineError> {
        let side = side_of(position);
        self.engine
            .handle_event(&KeyMatrixEvent::new(scan_pressing(&[position], side), side))
            .await?;
        self.engine
            .handle_event(&KeyMatrixEvent::new(scan_pressing(&[], side), side))
            .await
    }
}

fn side_of(position: usize) -> Side {
    if position < KEYS_PER_HALF {
        Side::Left
    } else {
        Side::Right
    }
}

/// Raw scan in which exactly `positions` are down.
///
/// Each position's bit is found by decoding single-bit scans, so the test
/// does not depend on the wiring of the matrix.
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

fn desktop(keys: &[HidKeyCode]) -> Vec<u8> {
    HidReport::desktop(0, keys).encode()
}

/// Polls `sink` until it holds `count` writes or a second has passed.
async fn wait_for_writes(sink: &RecordingSink, count: usize) -> Vec<Vec<u8>> {
    for _ in 0..100 {
        if sink.writes().len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.writes()
}

// ── Engine with the built-in keymap ───────────────────────────────────────────

#[tokio::test]
async fn test_colemak_letter_reaches_default_destination() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands::default());

    // Act: position 15 is `a` on both layouts
    fx.tap(15).await.expect("tap");

    // Assert
    assert_eq!(
        fx.sink("abc123").writes(),
        vec![desktop(&[HidKeyCode::KeyA]), desktop(&[])]
    );
    assert!(fx.sink("def123").writes().is_empty());
}

#[tokio::test]
async fn test_function_layer_switches_to_alternate_layout_host() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands::default());

    // Act: one-shot function layer, then `def123`, then Colemak `e`
    fx.tap(75).await.expect("layer key");
    fx.tap(2).await.expect("device key");
    fx.tap(54).await.expect("letter");

    // Assert: def123 has its host set to Colemak, so it receives the QWERTY
    // code that the host maps back to `e`
    assert_eq!(fx.engine.session().device, "def123");
    assert_eq!(fx.engine.session().layer, 0);
    assert_eq!(
        fx.sink("def123").writes(),
        vec![desktop(&[HidKeyCode::KeyK]), desktop(&[])]
    );
    assert!(fx.sink("abc123").writes().is_empty());
}

#[tokio::test]
async fn test_power_off_needs_confirmation_on_symbol_layer() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands::default());

    // Act: first round only arms the command
    fx.tap(20).await.expect("layer key");
    fx.tap(0).await.expect("power off");
    let after_first = fx.commands.runs.lock().expect("lock").len();
    fx.tap(20).await.expect("layer key");
    fx.tap(0).await.expect("power off");

    // Assert
    assert_eq!(after_first, 0);
    assert_eq!(
        *fx.commands.runs.lock().expect("lock"),
        vec![SystemCommand::PowerOff]
    );
}

#[tokio::test]
async fn test_letter_between_presses_cancels_power_off() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands::default());

    // Act
    fx.tap(20).await.expect("layer key");
    fx.tap(0).await.expect("power off");
    fx.tap(15).await.expect("letter");
    fx.tap(20).await.expect("layer key");
    fx.tap(0).await.expect("power off");

    // Assert: the second press only re-armed
    assert!(fx.commands.runs.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_failing_power_off_stops_the_engine() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands {
        fail: true,
        ..RecordingCommands::default()
    });
    fx.tap(20).await.expect("layer key");
    fx.tap(0).await.expect("arm");
    fx.tap(20).await.expect("layer key");

    // Act
    let result = fx.tap(0).await;

    // Assert
    assert!(matches!(
        result,
        Err(EngineError::CommandFailed {
            command: SystemCommand::PowerOff,
            ..
        })
    ));
}

#[tokio::test]
async fn test_reset_key_resets_temporary_connections() {
    // Arrange
    let mut fx = Fixture::new(RecordingCommands::default());

    // Act
    fx.tap(75).await.expect("layer key");
    fx.tap(34).await.expect("reset key");

    // Assert
    assert_eq!(fx.reset.resets.load(Ordering::SeqCst), 1);
    assert_eq!(fx.engine.session().layer, 0);
}

#[tokio::test]
async fn test_every_default_destination_is_switchable() {
    // Arrange: (function-layer position, destination id, platform)
    let switches = [
        (2, "def123", Platform::MacOs),
        (3, "ghi123", Platform::MacOs),
        (4, "jkl123", Platform::Android),
        (5, "uin123", Platform::Linux),
        (35, "tmp123", Platform::MacOs),
        (39, "mno123", Platform::Windows),
        (1, "abc123", Platform::Linux),
    ];
    let mut fx = Fixture::new(RecordingCommands::default());

    for (position, id, platform) in switches {
        // Act
        fx.tap(75).await.expect("layer key");
        fx.tap(position).await.expect("device key");

        // Assert
        assert_eq!(fx.engine.session().device, id);
        let active = fx.engine.registry().get(id).expect("registered");
        assert_eq!(active.platform, platform);
    }
}

// ── Through the input pipeline ────────────────────────────────────────────────

/// Starts the pipeline and the engine; returns the fixture's sinks, a
/// sender for new halves and the engine task.
fn start_pipeline(
    fx: Fixture,
) -> (
    Vec<(String, Arc<RecordingSink>)>,
    mpsc::Sender<ergoblue_control::application::input_pipeline::PhysicalSource>,
    tokio::task::JoinHandle<Result<(), EngineError>>,
) {
    let (events_tx, events_rx) = mpsc::channel(16);
    let (sources_tx, sources_rx) = mpsc::channel(4);
    let pipeline = InputPipeline::new(LEFT_ADDRESS, RIGHT_ADDRESS, events_tx);
    tokio::spawn(pipeline.run(sources_rx));
    let sinks = fx.sinks;
    let engine = tokio::spawn(fx.engine.run(events_rx));
    (sinks, sources_tx, engine)
}

fn find(sinks: &[(String, Arc<RecordingSink>)], id: &str) -> Arc<RecordingSink> {
    sinks
        .iter()
        .find(|(sink_id, _)| sink_id == id)
        .map(|(_, sink)| Arc::clone(sink))
        .expect("destination is registered")
}

#[tokio::test]
async fn test_scans_from_both_halves_are_typed() {
    // Arrange
    let (sinks, sources, _engine) = start_pipeline(Fixture::new(RecordingCommands::default()));
    let (mut left, left_source) = MockHalf::connect(LEFT_ADDRESS);
    let (mut right, right_source) = MockHalf::connect(RIGHT_ADDRESS);
    sources.send(left_source).await.expect("pipeline running");
    sources.send(right_source).await.expect("pipeline running");
    let abc = find(&sinks, "abc123");

    // Act: `a` on the left half, then Colemak `e` on the right
    left.send_scan(scan_pressing(&[15], Side::Left)).await.expect("send");
    left.send_scan(scan_pressing(&[], Side::Left)).await.expect("send");
    wait_for_writes(&abc, 2).await;
    right.send_scan(scan_pressing(&[54], Side::Right)).await.expect("send");
    right.send_scan(scan_pressing(&[], Side::Right)).await.expect("send");
    let writes = wait_for_writes(&abc, 4).await;

    // Assert
    assert_eq!(
        writes,
        vec![
            desktop(&[HidKeyCode::KeyA]),
            desktop(&[]),
            desktop(&[HidKeyCode::KeyE]),
            desktop(&[]),
        ]
    );
}

#[tokio::test]
async fn test_replugged_half_keeps_typing() {
    // Arrange
    let (sinks, sources, _engine) = start_pipeline(Fixture::new(RecordingCommands::default()));
    let (first, source) = MockHalf::connect(LEFT_ADDRESS);
    sources.send(source).await.expect("pipeline running");
    first.unplug();

    // Act: the same half comes back as a new device node
    let (mut second, source) = MockHalf::connect(LEFT_ADDRESS);
    sources.send(source).await.expect("pipeline running");
    second.send_scan(scan_pressing(&[15], Side::Left)).await.expect("send");
    second.send_scan(scan_pressing(&[], Side::Left)).await.expect("send");

    // Assert
    let writes = wait_for_writes(&find(&sinks, "abc123"), 2).await;
    assert_eq!(writes, vec![desktop(&[HidKeyCode::KeyA]), desktop(&[])]);
}

#[tokio::test]
async fn test_engine_stops_when_pipeline_is_dropped() {
    // Arrange
    let (_sinks, sources, engine) = start_pipeline(Fixture::new(RecordingCommands::default()));

    // Act: no more sources and no attached halves closes the event channel
    drop(sources);

    // Assert
    let result = tokio::time::timeout(Duration::from_secs(1), engine)
        .await
        .expect("engine stops")
        .expect("engine task did not panic");
    assert!(result.is_ok());
}
