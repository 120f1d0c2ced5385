//! Report sink that types into the controller itself through `/dev/uinput`.
//!
//! The virtual keyboard speaks Linux key codes, not HID reports, so the sink
//! keeps the last desktop report it saw and turns each new one into the key
//! releases and presses that separate them.  Consumer-control reports have no
//! equivalent on this device and are ignored.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ergoblue_core::keymap::linux_evdev::{hid_to_evdev, supported_evdev_codes};
use ergoblue_core::{decode_report, HidKeyCode, HidReport};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key};
use tracing::trace;

use crate::application::device_registry::{ReportSink, SinkError};

/// Name the virtual keyboard registers under.
pub const DEVICE_NAME: &str = "ErgoBlue";
/// Same identity as the USB gadget, so both look like one keyboard.
const VENDOR_ID: u16 = 0x1d6b;
const PRODUCT_ID: u16 = 0x0104;
const VERSION: u16 = 0x0001;

/// Key event values understood by the input subsystem.
const KEY_RELEASED: i32 = 0;
const KEY_PRESSED: i32 = 1;

struct UinputState {
    device: VirtualDevice,
    previous: HidReport,
}

/// Sink emitting key events on a virtual keyboard.
pub struct UinputSink {
    state: Mutex<UinputState>,
}

impl UinputSink {
    /// Creates the virtual keyboard, declaring every key the HID table maps.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if `/dev/uinput` cannot be opened or the device
    /// cannot be created.
    pub fn create() -> std::io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for code in supported_evdev_codes() {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, VERSION))
            .with_keys(&keys)?
            .build()?;

        Ok(Self {
            state: Mutex::new(UinputState {
                device,
                previous: HidReport::desktop(0, &[]),
            }),
        })
    }
}

#[async_trait]
impl ReportSink for UinputSink {
    async fn write(&self, report: &[u8]) -> Result<usize, SinkError> {
        let next = match decode_report(report) {
            Ok(next @ HidReport::Desktop { .. }) => next,
            Ok(HidReport::Consumer { .. }) => return Ok(report.len()),
            Err(e) => {
                trace!(error = %e, "undecodable report ignored");
                return Ok(report.len());
            }
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let events: Vec<InputEvent> = key_transitions(&state.previous, &next)
            .into_iter()
            .filter_map(|(code, pressed)| {
                let value = if pressed { KEY_PRESSED } else { KEY_RELEASED };
                hid_to_evdev(code).map(|key| InputEvent::new(EventType::KEY, key, value))
            })
            .collect();

        if !events.is_empty() {
            // emit() appends the SYN_REPORT that commits the batch.
            state.device.emit(&events)?;
        }
        state.previous = next;
        Ok(report.len())
    }
}

/// Key releases, then key presses, that turn `previous` into `next`.
///
/// Modifiers are compared bit by bit; ordinary keys by membership.
pub fn key_transitions(previous: &HidReport, next: &HidReport) -> Vec<(HidKeyCode, bool)> {
    let (before_mods, after_mods) = match (previous, next) {
        (
            HidReport::Desktop { modifiers: a, .. },
            HidReport::Desktop { modifiers: b, .. },
        ) => (*a, *b),
        _ => (0, 0),
    };
    let before_keys = previous.pressed_keys();
    let after_keys = next.pressed_keys();

    let mut transitions = Vec::new();
    for index in 0..8 {
        let mask = 1u8 << index;
        if before_mods & mask != 0 && after_mods & mask == 0 {
            transitions.extend(HidKeyCode::from_modifier_index(index).map(|c| (c, false)));
        }
    }
    transitions.extend(
        before_keys
            .iter()
            .filter(|k| !after_keys.contains(k))
            .map(|k| (*k, false)),
    );
    for index in 0..8 {
        let mask = 1u8 << index;
        if before_mods & mask == 0 && after_mods & mask != 0 {
            transitions.extend(HidKeyCode::from_modifier_index(index).map(|c| (c, true)));
        }
    }
    transitions.extend(
        after_keys
            .iter()
            .filter(|k| !before_keys.contains(k))
            .map(|k| (*k, true)),
    );
    transitions
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key_is_a_press() {
        // Arrange
        let before = HidReport::desktop(0, &[]);
        let after = HidReport::desktop(0, &[HidKeyCode::KeyA]);

        // Act
        let transitions = key_transitions(&before, &after);

        // Assert
        assert_eq!(transitions, vec![(HidKeyCode::KeyA, true)]);
    }

    #[test]
    fn test_releases_come_before_presses() {
        // Arrange
        let before = HidReport::desktop(0b0000_0001, &[HidKeyCode::KeyA]);
        let after = HidReport::desktop(0b0000_0010, &[HidKeyCode::KeyB]);

        // Act
        let transitions = key_transitions(&before, &after);

        // Assert
        assert_eq!(
            transitions,
            vec![
                (HidKeyCode::ControlLeft, false),
                (HidKeyCode::KeyA, false),
                (HidKeyCode::ShiftLeft, true),
                (HidKeyCode::KeyB, true),
            ]
        );
    }

    #[test]
    fn test_unchanged_report_has_no_transitions() {
        let report = HidReport::desktop(0b1000_0000, &[HidKeyCode::KeyZ, HidKeyCode::Digit1]);
        assert!(key_transitions(&report, &report).is_empty());
    }

    #[test]
    fn test_reordered_keys_are_not_transitions() {
        // Arrange
        let before = HidReport::desktop(0, &[HidKeyCode::KeyA, HidKeyCode::KeyB]);
        let after = HidReport::desktop(0, &[HidKeyCode::KeyB, HidKeyCode::KeyA]);

        // Act / Assert
        assert!(key_transitions(&before, &after).is_empty());
    }
}
