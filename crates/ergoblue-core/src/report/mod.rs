//! HID reports: the byte layouts sent to hosts and the descriptor that
//! declares them.

pub mod descriptor;
pub mod encoder;

pub use descriptor::{descriptor_hex, KEYBOARD_REPORT_DESCRIPTOR};
pub use encoder::{
    decode_report, frame_for_bluetooth, HidReport, ReportError, BLUETOOTH_INPUT_HEADER,
    CONSUMER_REPORT_ID, CONSUMER_REPORT_LEN, DESKTOP_REPORT_ID, DESKTOP_REPORT_LEN,
    MAX_PRESSED_KEYS,
};
