//! # ergoblue-core
//!
//! Pure building blocks of the ErgoBlue split-keyboard controller: HID usage
//! codes, report layouts, scan-matrix decoding and the keymap.
//!
//! This crate has zero dependencies on OS APIs, device files, or sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Each keyboard half streams raw 8-byte matrix scans to the controller.  The
//! controller decodes them into key positions, looks the positions up in a
//! layered keymap, and sends standard HID reports to whichever host is
//! currently selected: over USB, over Bluetooth, or into a virtual keyboard on
//! the controller itself.
//!
//! - **`domain`** – Matrix decoding, the [`Key`] sum type, layers and the
//!   built-in keymap.
//!
//! - **`report`** – The HID report descriptor and the byte layout of the
//!   keyboard and consumer-control reports.
//!
//! - **`keymap`** – HID usage codes and their Linux input event equivalents.

pub mod domain;
pub mod keymap;
pub mod report;

// Re-export the most-used types at the crate root so callers can write
// `ergoblue_core::Key` instead of `ergoblue_core::domain::key::Key`.
pub use domain::ascii::ascii_key;
pub use domain::default_layers::ergoblue_keymap;
pub use domain::key::{FunctionKey, Key, Lock, SystemCommand, ZERO_WIDTH_JOINER};
pub use domain::keymap::{Keymap, KeymapError, Layer};
pub use domain::matrix::{
    HalfScan, KeyEdge, KeyMatrixEvent, Side, KEYS_PER_HALF, MATRIX_KEYS, RAW_REPORT_LEN,
};
pub use domain::platform::Platform;
pub use keymap::hid::HidKeyCode;
pub use report::{decode_report, HidReport, ReportError};
