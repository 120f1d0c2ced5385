//! The HID report descriptor shared by every output transport.
//!
//! The same bytes are handed to the USB gadget setup script (raw) and to the
//! Bluetooth service record (hex), so hosts on either transport parse the
//! reports produced by [`crate::report::encoder`] identically.
//!
//! ```text
//! Collection 1: Keyboard          report id 1
//!   8 x 1 bit   modifiers  (usages 0xE0–0xE7)
//!   6 x 8 bits  key array  (usages 0x00–0xFF)
//! Collection 2: Consumer Control  report id 2
//!   1 x 16 bits usage      (range 0x001–0x29C)
//! ```

/// Keyboard + consumer-control report descriptor.
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop Ctrls)
    0x09, 0x06, // Usage (Keyboard)
    0xa1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x95, 0x08, //   Report Count (8)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x07, //   Usage Page (Kbrd/Keypad)
    0x19, 0xe0, //   Usage Minimum (0xE0)
    0x29, 0xe7, //   Usage Maximum (0xE7)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x81, 0x02, //   Input (Data, Var, Abs)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0xff, //   Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Kbrd/Keypad)
    0x19, 0x00, //   Usage Minimum (0x00)
    0x29, 0xff, //   Usage Maximum (0xFF)
    0x81, 0x00, //   Input (Data, Array, Abs)
    0xc0, // End Collection
    0x05, 0x0c, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xa1, 0x01, // Collection (Application)
    0x85, 0x02, //   Report ID (2)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x10, //   Report Size (16)
    0x15, 0x01, //   Logical Minimum (1)
    0x26, 0x9c, 0x02, //   Logical Maximum (668)
    0x19, 0x01, //   Usage Minimum (Consumer Control)
    0x2a, 0x9c, 0x02, //   Usage Maximum (AC Distribute Vertically)
    0x81, 0x00, //   Input (Data, Array, Abs)
    0xc0, // End Collection
];

/// Lowercase hex rendering of the descriptor, as embedded in the SDP record.
pub fn descriptor_hex() -> String {
    KEYBOARD_REPORT_DESCRIPTOR
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
