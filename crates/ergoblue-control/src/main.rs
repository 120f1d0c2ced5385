//! ErgoBlue controller entry point.
//!
//! Wires the infrastructure adapters to the keymap engine and runs until a
//! fatal error or Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- TOML file or built-in defaults
//!  └─ build_destinations()      -- one sink per destination
//!  └─ start services
//!       ├─ Multiplexer::serve   (L2CAP control + interrupt listeners)
//!       ├─ HidrawEnumerator     (finds the keyboard halves)
//!       ├─ InputPipeline        (one reader task per half)
//!       └─ KeymapEngine::run    (owns the session; runs on this task)
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ergoblue_core::report::{descriptor_hex, KEYBOARD_REPORT_DESCRIPTOR};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ergoblue_control::application::device_registry::{Destination, DeviceRegistry, ReportSink};
use ergoblue_control::application::input_pipeline::InputPipeline;
use ergoblue_control::application::keymap_engine::KeymapEngine;
use ergoblue_control::infrastructure::input_source::hidraw::HidrawEnumerator;
use ergoblue_control::infrastructure::output::bluetooth::BluetoothSink;
use ergoblue_control::infrastructure::storage::config::{
    load_config, BluetoothConfig, ControllerConfig, OutputConfig, TransportKind,
    DEFAULT_CONFIG_PATH,
};
use ergoblue_control::infrastructure::system::ProcessCommandRunner;
use ergoblue_control::infrastructure::transport::multiplexer::{RouteTable, TemporaryReset};

/// Scans buffered between the input pipeline and the engine.
const EVENT_QUEUE_DEPTH: usize = 64;
/// Newly discovered halves waiting to be attached.
const SOURCE_QUEUE_DEPTH: usize = 4;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// ErgoBlue split-keyboard controller.
///
/// Reads both keyboard halves, applies the layered keymap and types into the
/// selected host over USB, Bluetooth or a local virtual keyboard.
#[derive(Debug, Parser)]
#[command(
    name = "ergoblue-control",
    about = "Split-keyboard controller: keymap engine and HID output multiplexer",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// A missing file means the built-in defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "ERGOBLUE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the HID report descriptor for the gadget and SDP setup scripts.
    Descriptor {
        #[arg(long, value_enum, default_value_t = DescriptorFormat::Hex)]
        format: DescriptorFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DescriptorFormat {
    /// Lowercase hex on one line (SDP record template).
    Hex,
    /// The raw bytes (configfs `report_desc`).
    Raw,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Descriptor { format }) = cli.command {
        return print_descriptor(format);
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.controller.log_level)),
        )
        .init();

    info!(config = %cli.config.display(), "ErgoBlue controller starting");
    let result = run(config).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "controller stopped on a fatal error");
    }
    result
}

fn print_descriptor(format: DescriptorFormat) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match format {
        DescriptorFormat::Hex => writeln!(stdout, "{}", descriptor_hex()),
        DescriptorFormat::Raw => stdout.write_all(KEYBOARD_REPORT_DESCRIPTOR),
    }
    .context("writing descriptor to stdout")?;
    stdout.flush().context("writing descriptor to stdout")
}

async fn run(config: ControllerConfig) -> anyhow::Result<()> {
    let reset = TemporaryReset::new();
    let (registry, routes) = build_destinations(&config)?;

    let keymap = ergoblue_core::ergoblue_keymap().context("building the built-in keymap")?;
    let engine = KeymapEngine::new(
        Arc::new(keymap),
        registry,
        &config.controller.default_destination,
        Arc::new(ProcessCommandRunner::from_config(&config.commands)),
        Arc::new(reset.clone()),
    )
    .context("keymap does not match the configured destinations")?;

    if config.uses_bluetooth() {
        start_bluetooth(&config.bluetooth, routes, reset)?;
    }

    // ── Input ─────────────────────────────────────────────────────────────────
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (sources_tx, sources_rx) = mpsc::channel(SOURCE_QUEUE_DEPTH);
    let pipeline = InputPipeline::new(
        config.controller.left_half.clone(),
        config.controller.right_half.clone(),
        events_tx,
    );
    tokio::spawn(pipeline.run(sources_rx));
    tokio::spawn(
        HidrawEnumerator::new(
            config.controller.source_name_prefix.clone(),
            config.controller.rescan_interval(),
        )
        .run(sources_tx),
    );

    info!("ErgoBlue controller ready.  Press Ctrl-C to exit.");

    tokio::select! {
        result = engine.run(events_rx) => result.context("keymap engine failed")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for Ctrl-C")?;
            info!("shutdown signal received");
        }
    }

    info!("ErgoBlue controller stopped");
    Ok(())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Opens one sink per configured destination.  Bluetooth queues are also
/// entered into the route table the multiplexer serves.
fn build_destinations(config: &ControllerConfig) -> anyhow::Result<(DeviceRegistry, RouteTable)> {
    let deadline = config.output.write_deadline();
    let mut registry = DeviceRegistry::new();
    let mut routes = RouteTable::new();

    for entry in &config.destinations {
        let sink: Arc<dyn ReportSink> = match entry.transport {
            TransportKind::Gadget => open_gadget(&config.output)?,
            TransportKind::Uinput => create_uinput()?,
            TransportKind::Bluetooth => {
                let (sink, queue) = BluetoothSink::with_queue(deadline);
                match entry.bd_addr()? {
                    Some(addr) => routes.add(addr, queue),
                    None => routes.set_temporary(queue),
                }
                Arc::new(sink)
            }
        };
        registry.register(Destination::new(
            entry.id.clone(),
            entry.platform,
            entry.alternate_layout,
            sink,
        ))?;
        info!(
            destination = %entry.id,
            platform = %entry.platform,
            transport = ?entry.transport,
            "destination ready"
        );
    }
    Ok((registry, routes))
}

#[cfg(target_os = "linux")]
fn open_gadget(output: &OutputConfig) -> anyhow::Result<Arc<dyn ReportSink>> {
    use ergoblue_control::infrastructure::output::gadget::GadgetSink;

    let sink = GadgetSink::open(&output.gadget_path, output.write_deadline())
        .with_context(|| format!("opening USB gadget {}", output.gadget_path.display()))?;
    Ok(Arc::new(sink))
}

#[cfg(not(target_os = "linux"))]
fn open_gadget(_output: &OutputConfig) -> anyhow::Result<Arc<dyn ReportSink>> {
    anyhow::bail!("the USB gadget output is only available on Linux")
}

#[cfg(target_os = "linux")]
fn create_uinput() -> anyhow::Result<Arc<dyn ReportSink>> {
    use ergoblue_control::infrastructure::output::uinput::UinputSink;

    let sink = UinputSink::create().context("creating the uinput virtual keyboard")?;
    Ok(Arc::new(sink))
}

#[cfg(not(target_os = "linux"))]
fn create_uinput() -> anyhow::Result<Arc<dyn ReportSink>> {
    anyhow::bail!("the uinput output is only available on Linux")
}

#[cfg(target_os = "linux")]
fn start_bluetooth(
    bluetooth: &BluetoothConfig,
    routes: RouteTable,
    reset: TemporaryReset,
) -> anyhow::Result<()> {
    use ergoblue_control::infrastructure::transport::l2cap::L2capListener;
    use ergoblue_control::infrastructure::transport::multiplexer::{Channel, Multiplexer};

    let control = L2capListener::bind(bluetooth.control_psm, bluetooth.backlog)
        .context("opening the L2CAP control channel")?;
    let interrupt = L2capListener::bind(bluetooth.interrupt_psm, bluetooth.backlog)
        .context("opening the L2CAP interrupt channel")?;

    let mux = Multiplexer::new(routes, reset, bluetooth.socket_write_timeout());
    let control_mux = mux.clone();
    tokio::spawn(async move { control_mux.serve(control, Channel::Control).await });
    tokio::spawn(async move { mux.serve(interrupt, Channel::Interrupt).await });
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn start_bluetooth(
    _bluetooth: &BluetoothConfig,
    _routes: RouteTable,
    _reset: TemporaryReset,
) -> anyhow::Result<()> {
    anyhow::bail!("Bluetooth destinations are only available on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
