//! Key code tables.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07, Keyboard/Keypad).
//! Codes are translated to Linux input event codes only at the uinput boundary.

pub mod hid;
pub mod linux_evdev;

pub use hid::HidKeyCode;
