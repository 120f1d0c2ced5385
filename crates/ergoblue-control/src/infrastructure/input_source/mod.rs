//! Physical input sources: the two keyboard halves as seen by the controller.
//!
//! Each half shows up as a HID device whose name is the configured prefix
//! followed by the half's address (for example `ErgoBlue 000000000000`).
//! The enumerator finds such devices, and every one it accepts becomes a
//! [`PhysicalSource`]: the address plus a byte stream of 8-byte scans.
//!
//! # Discovery (for beginners)
//!
//! ```text
//! /sys/class/hidraw/hidraw3/device/uevent ── HID_NAME=ErgoBlue 000000000000
//!        │                                            │
//!        ▼                                            ▼
//!   /dev/hidraw3 (byte stream)              address "000000000000"
//!        └──────────────► PhysicalSource ◄────────────┘
//! ```
//!
//! Devices with any other name are reported as [`SourceError::Unrecognized`]
//! and skipped; they never stop enumeration.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::application::input_pipeline::PhysicalSource;

pub mod hidraw;
pub mod mock;

/// Key in a uevent file that carries the device name.
const HID_NAME_KEY: &str = "HID_NAME=";

/// Error type for input-source discovery.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The device is not one of the keyboard halves.
    #[error("unrecognized input device: {0:?}")]
    Unrecognized(String),

    /// A device or its description could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extracts a half's address from its device name.
///
/// # Errors
///
/// Returns [`SourceError::Unrecognized`] when `name` does not start with
/// `prefix` or carries nothing after it.
pub fn classify_name(prefix: &str, name: &str) -> Result<String, SourceError> {
    match name.strip_prefix(prefix) {
        Some(address) if !address.trim().is_empty() => Ok(address.trim().to_string()),
        _ => Err(SourceError::Unrecognized(name.to_string())),
    }
}

/// The `HID_NAME=` value of a sysfs uevent file, if present.
pub fn parse_hid_name(uevent: &str) -> Option<&str> {
    uevent
        .lines()
        .find_map(|line| line.strip_prefix(HID_NAME_KEY))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
