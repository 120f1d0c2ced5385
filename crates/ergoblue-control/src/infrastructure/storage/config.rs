//! TOML configuration for the controller.
//!
//! Default location: `/etc/ergoblue/config.toml` (override with `--config`
//! or `ERGOBLUE_CONFIG`).
//!
//! # Example (for beginners)
//!
//! ```toml
//! [controller]
//! default_destination = "abc123"
//! left_half = "000000000000"
//! right_half = "111111111111"
//!
//! [output]
//! write_deadline_ms = 5
//!
//! [[destinations]]
//! id = "abc123"
//! platform = "linux"
//! transport = "gadget"
//!
//! [[destinations]]
//! id = "def123"
//! platform = "macos"
//! transport = "bluetooth"
//! address = "DC:A6:32:00:00:01"
//! ```
//!
//! Every field is optional.  Fields annotated with
//! `#[serde(default = "some_fn")]` take the value of `some_fn()` when they
//! are absent, and a missing `[[destinations]]` list means the built-in
//! set of seven destinations.  Giving any `[[destinations]]` entry replaces
//! that whole set.
//!
//! # Destinations
//!
//! A Bluetooth destination with an `address` is *provisioned*: connections
//! from that address always reach it.  At most one Bluetooth destination
//! may omit the address; it becomes the *temporary* destination shared by
//! hosts the controller has never seen.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ergoblue_core::Platform;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::transport::address::{AddressParseError, BdAddr};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ergoblue/config.toml";

/// Error type for loading and validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("destination {0:?} is defined more than once")]
    DuplicateDestination(String),

    #[error("Bluetooth address {address} is used by both {first:?} and {second:?}")]
    DuplicateAddress {
        address: BdAddr,
        first: String,
        second: String,
    },

    #[error("only one temporary Bluetooth destination is allowed, found {first:?} and {second:?}")]
    MultipleTemporary { first: String, second: String },

    #[error("default destination {0:?} is not defined")]
    UnknownDefault(String),

    #[error("destination {id:?} has an invalid address: {source}")]
    InvalidAddress {
        id: String,
        #[source]
        source: AddressParseError,
    },

    #[error("destination {0:?} has an address but does not use Bluetooth")]
    UnexpectedAddress(String),

    #[error("no command configured for {0}")]
    EmptyCommand(&'static str),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bluetooth: BluetoothConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default = "default_destinations")]
    pub destinations: Vec<DestinationEntry>,
}

/// Session and input settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerSection {
    /// Destination active at startup.
    #[serde(default = "default_destination")]
    pub default_destination: String,
    /// Address of the left keyboard half.
    #[serde(default = "default_left_half")]
    pub left_half: String,
    /// Address of the right keyboard half.
    #[serde(default = "default_right_half")]
    pub right_half: String,
    /// HID name prefix that identifies a keyboard half.
    #[serde(default = "default_source_name_prefix")]
    pub source_name_prefix: String,
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How often hidraw devices are rescanned.
    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,
}

/// Output sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Deadline for one report write to any sink.
    #[serde(default = "default_write_deadline_ms")]
    pub write_deadline_ms: u64,
    /// USB gadget HID device file.
    #[serde(default = "default_gadget_path")]
    pub gadget_path: PathBuf,
}

/// L2CAP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BluetoothConfig {
    #[serde(default = "default_control_psm")]
    pub control_psm: u16,
    #[serde(default = "default_interrupt_psm")]
    pub interrupt_psm: u16,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Deadline for writing one frame to a connected host.
    #[serde(default = "default_socket_write_timeout_ms")]
    pub socket_write_timeout_ms: u64,
}

/// Argument vectors for the guarded system commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "default_power_off")]
    pub power_off: Vec<String>,
    #[serde(default = "default_reboot")]
    pub reboot: Vec<String>,
}

/// How reports reach a destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// USB gadget device file.
    Gadget,
    /// Virtual keyboard on the controller itself.
    Uinput,
    /// A Bluetooth host reached through the L2CAP multiplexer.
    Bluetooth,
}

/// One output destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DestinationEntry {
    pub id: String,
    pub platform: Platform,
    pub transport: TransportKind,
    /// Send the QWERTY alternate code for letters.
    #[serde(default)]
    pub alternate_layout: bool,
    /// Printable Bluetooth address; absent for the temporary destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_destination() -> String {
    "abc123".to_string()
}
fn default_left_half() -> String {
    "000000000000".to_string()
}
fn default_right_half() -> String {
    "111111111111".to_string()
}
fn default_source_name_prefix() -> String {
    "ErgoBlue ".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_rescan_interval_ms() -> u64 {
    1000
}
fn default_write_deadline_ms() -> u64 {
    5
}
fn default_gadget_path() -> PathBuf {
    PathBuf::from("/dev/hidg0")
}
fn default_control_psm() -> u16 {
    17
}
fn default_interrupt_psm() -> u16 {
    19
}
fn default_backlog() -> u32 {
    16
}
fn default_socket_write_timeout_ms() -> u64 {
    5
}
fn default_power_off() -> Vec<String> {
    vec!["poweroff".to_string()]
}
fn default_reboot() -> Vec<String> {
    vec!["reboot".to_string()]
}

fn destination(
    id: &str,
    platform: Platform,
    transport: TransportKind,
    alternate_layout: bool,
    address: Option<&str>,
) -> DestinationEntry {
    DestinationEntry {
        id: id.to_string(),
        platform,
        transport,
        alternate_layout,
        address: address.map(str::to_string),
    }
}

/// The destinations the built-in keymap switches between.  Bluetooth
/// addresses are placeholders to be replaced by the paired hosts' own.
fn default_destinations() -> Vec<DestinationEntry> {
    use Platform::*;
    use TransportKind::*;

    vec![
        destination("abc123", Linux, Gadget, false, None),
        destination("uin123", Linux, Uinput, false, None),
        destination("def123", MacOs, Bluetooth, true, Some("00:00:00:00:00:01")),
        destination("ghi123", MacOs, Bluetooth, false, Some("00:00:00:00:00:02")),
        destination("jkl123", Android, Bluetooth, false, Some("00:00:00:00:00:03")),
        destination("mno123", Windows, Bluetooth, true, Some("00:00:00:00:00:04")),
        destination("tmp123", MacOs, Bluetooth, false, None),
    ]
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller: ControllerSection::default(),
            output: OutputConfig::default(),
            bluetooth: BluetoothConfig::default(),
            commands: CommandsConfig::default(),
            destinations: default_destinations(),
        }
    }
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            default_destination: default_destination(),
            left_half: default_left_half(),
            right_half: default_right_half(),
            source_name_prefix: default_source_name_prefix(),
            log_level: default_log_level(),
            rescan_interval_ms: default_rescan_interval_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_deadline_ms: default_write_deadline_ms(),
            gadget_path: default_gadget_path(),
        }
    }
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            control_psm: default_control_psm(),
            interrupt_psm: default_interrupt_psm(),
            backlog: default_backlog(),
            socket_write_timeout_ms: default_socket_write_timeout_ms(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            power_off: default_power_off(),
            reboot: default_reboot(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ControllerSection {
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }
}

impl OutputConfig {
    pub fn write_deadline(&self) -> Duration {
        Duration::from_millis(self.write_deadline_ms)
    }
}

impl BluetoothConfig {
    pub fn socket_write_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_write_timeout_ms)
    }
}

impl DestinationEntry {
    /// The parsed Bluetooth address, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] for a malformed address.
    pub fn bd_addr(&self) -> Result<Option<BdAddr>, ConfigError> {
        self.address
            .as_deref()
            .map(|text| {
                text.parse().map_err(|source| ConfigError::InvalidAddress {
                    id: self.id.clone(),
                    source,
                })
            })
            .transpose()
    }

    /// A Bluetooth destination without an address.
    pub fn is_temporary(&self) -> bool {
        self.transport == TransportKind::Bluetooth && self.address.is_none()
    }
}

impl ControllerConfig {
    /// Whether any destination needs the L2CAP listeners.
    pub fn uses_bluetooth(&self) -> bool {
        self.destinations
            .iter()
            .any(|d| d.transport == TransportKind::Bluetooth)
    }

    /// Checks the destination list and commands for mistakes that would
    /// only surface at runtime.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut addresses: Vec<(BdAddr, &str)> = Vec::new();
        let mut temporary: Option<&str> = None;

        for entry in &self.destinations {
            if !ids.insert(entry.id.as_str()) {
                return Err(ConfigError::DuplicateDestination(entry.id.clone()));
            }

            match (entry.transport, entry.bd_addr()?) {
                (TransportKind::Bluetooth, Some(address)) => {
                    if let Some((_, first)) = addresses.iter().find(|(a, _)| *a == address) {
                        return Err(ConfigError::DuplicateAddress {
                            address,
                            first: first.to_string(),
                            second: entry.id.clone(),
                        });
                    }
                    addresses.push((address, entry.id.as_str()));
                }
                (TransportKind::Bluetooth, None) => {
                    if let Some(first) = temporary {
                        return Err(ConfigError::MultipleTemporary {
                            first: first.to_string(),
                            second: entry.id.clone(),
                        });
                    }
                    temporary = Some(entry.id.as_str());
                }
                (_, Some(_)) => return Err(ConfigError::UnexpectedAddress(entry.id.clone())),
                (_, None) => {}
            }
        }

        if !ids.contains(self.controller.default_destination.as_str()) {
            return Err(ConfigError::UnknownDefault(
                self.controller.default_destination.clone(),
            ));
        }
        if self.commands.power_off.is_empty() {
            return Err(ConfigError::EmptyCommand("power-off"));
        }
        if self.commands.reboot.is_empty() {
            return Err(ConfigError::EmptyCommand("reboot"));
        }
        Ok(())
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Loads and validates the configuration at `path`, returning
/// `ControllerConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and the validation
/// variants if the content is inconsistent.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ControllerConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    config.validate()?;
    Ok(config)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
