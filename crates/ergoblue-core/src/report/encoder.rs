//! Byte layouts of the two input reports declared by the descriptor.
//!
//! ```text
//! Desktop  (8 bytes): [0x01][modifiers][k1][k2][k3][k4][k5][k6]
//! Consumer (3 bytes): [0x02][usage lo][usage hi]
//! ```
//!
//! Unused key slots are zero.  Bluetooth hosts additionally expect a one-byte
//! DATA | INPUT header (0xA1) in front of every report on the interrupt
//! channel; see [`frame_for_bluetooth`].

use thiserror::Error;

use crate::keymap::hid::HidKeyCode;

/// Report id of the keyboard collection.
pub const DESKTOP_REPORT_ID: u8 = 0x01;
/// Report id of the consumer-control collection.
pub const CONSUMER_REPORT_ID: u8 = 0x02;
/// Encoded length of a desktop report, report id included.
pub const DESKTOP_REPORT_LEN: usize = 8;
/// Encoded length of a consumer report, report id included.
pub const CONSUMER_REPORT_LEN: usize = 3;
/// Number of simultaneous non-modifier keys a desktop report can carry.
pub const MAX_PRESSED_KEYS: usize = 6;
/// HIDP transaction header for an input report on the interrupt channel.
pub const BLUETOOTH_INPUT_HEADER: u8 = 0xA1;

/// Errors produced when decoding report bytes.
#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    /// No bytes at all.
    #[error("empty report")]
    Empty,

    /// The first byte is not one of the declared report ids.
    #[error("unknown report id: 0x{0:02X}")]
    UnknownReportId(u8),

    /// Fewer bytes than the layout of the report id requires.
    #[error("insufficient data: need {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },
}

/// One input report, as declared by
/// [`KEYBOARD_REPORT_DESCRIPTOR`](crate::report::KEYBOARD_REPORT_DESCRIPTOR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidReport {
    /// Report id 1: modifier bitmask plus up to six key usages.
    Desktop { modifiers: u8, keys: [u8; MAX_PRESSED_KEYS] },
    /// Report id 2: a single consumer-page usage; 0 means "released".
    Consumer { usage: u16 },
}

impl HidReport {
    /// Builds a desktop report from the modifier byte and the pressed keys in
    /// insertion order.
    ///
    /// Keys past the sixth are ignored; callers are expected to enforce the cap
    /// before a key ever becomes "pressed".
    pub fn desktop(modifiers: u8, pressed: &[HidKeyCode]) -> Self {
        let mut keys = [0u8; MAX_PRESSED_KEYS];
        for (slot, key) in keys.iter_mut().zip(pressed) {
            *slot = key.as_u8();
        }
        HidReport::Desktop { modifiers, keys }
    }

    /// Builds a consumer report for `usage`.
    pub fn consumer(usage: u16) -> Self {
        HidReport::Consumer { usage }
    }

    /// Encodes the report into its wire bytes, report id first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ergoblue_core::report::{decode_report, HidReport};
    /// use ergoblue_core::HidKeyCode;
    ///
    /// let report = HidReport::desktop(0b0000_0010, &[HidKeyCode::KeyA]);
    /// let bytes = report.encode();
    /// assert_eq!(bytes, vec![0x01, 0x02, 0x04, 0, 0, 0, 0, 0]);
    /// assert_eq!(decode_report(&bytes).unwrap(), report);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            HidReport::Desktop { modifiers, keys } => {
                let mut buf = Vec::with_capacity(DESKTOP_REPORT_LEN);
                buf.push(DESKTOP_REPORT_ID);
                buf.push(modifiers);
                buf.extend_from_slice(&keys);
                buf
            }
            HidReport::Consumer { usage } => {
                let mut buf = Vec::with_capacity(CONSUMER_REPORT_LEN);
                buf.push(CONSUMER_REPORT_ID);
                buf.extend_from_slice(&usage.to_le_bytes());
                buf
            }
        }
    }

    /// Non-zero key usages of a desktop report; empty for consumer reports.
    pub fn pressed_keys(&self) -> Vec<HidKeyCode> {
        match self {
            HidReport::Desktop { keys, .. } => keys
                .iter()
                .filter(|k| **k != 0)
                .map(|k| HidKeyCode::from_u8(*k))
                .collect(),
            HidReport::Consumer { .. } => Vec::new(),
        }
    }
}

/// Decodes report bytes produced by [`HidReport::encode`].
///
/// # Errors
///
/// Returns [`ReportError`] for empty input, an unknown report id, or a report
/// shorter than its layout.
pub fn decode_report(bytes: &[u8]) -> Result<HidReport, ReportError> {
    let (&id, rest) = bytes.split_first().ok_or(ReportError::Empty)?;
    match id {
        DESKTOP_REPORT_ID => {
            require_len(bytes, DESKTOP_REPORT_LEN)?;
            let mut keys = [0u8; MAX_PRESSED_KEYS];
            keys.copy_from_slice(&rest[1..=MAX_PRESSED_KEYS]);
            Ok(HidReport::Desktop {
                modifiers: rest[0],
                keys,
            })
        }
        CONSUMER_REPORT_ID => {
            require_len(bytes, CONSUMER_REPORT_LEN)?;
            Ok(HidReport::Consumer {
                usage: u16::from_le_bytes([rest[0], rest[1]]),
            })
        }
        other => Err(ReportError::UnknownReportId(other)),
    }
}

/// Prepends the Bluetooth HIDP input header to an encoded report.
pub fn frame_for_bluetooth(report: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(report.len() + 1);
    frame.push(BLUETOOTH_INPUT_HEADER);
    frame.extend_from_slice(report);
    frame
}

fn require_len(bytes: &[u8], needed: usize) -> Result<(), ReportError> {
    if bytes.len() < needed {
        return Err(ReportError::InsufficientData {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
