//! HID Usage ID to Linux input event code translation.
//!
//! The uinput sink turns HID reports back into `EV_KEY` events for the
//! controller's own virtual keyboard.  The codes follow
//! `include/uapi/linux/input-event-codes.h` and the kernel's `usbkbd` driver
//! table, so a key typed through uinput lands on the same key a USB keyboard
//! would produce.

use super::hid::HidKeyCode;

/// Translates a [`HidKeyCode`] to a Linux `KEY_*` input event code.
///
/// Returns `None` for [`HidKeyCode::Unknown`].
pub fn hid_to_evdev(hid: HidKeyCode) -> Option<u16> {
    match hid {
        // Letters
        HidKeyCode::KeyA => Some(30), // KEY_A
        HidKeyCode::KeyB => Some(48), // KEY_B
        HidKeyCode::KeyC => Some(46), // KEY_C
        HidKeyCode::KeyD => Some(32), // KEY_D
        HidKeyCode::KeyE => Some(18), // KEY_E
        HidKeyCode::KeyF => Some(33), // KEY_F
        HidKeyCode::KeyG => Some(34), // KEY_G
        HidKeyCode::KeyH => Some(35), // KEY_H
        HidKeyCode::KeyI => Some(23), // KEY_I
        HidKeyCode::KeyJ => Some(36), // KEY_J
        HidKeyCode::KeyK => Some(37), // KEY_K
        HidKeyCode::KeyL => Some(38), // KEY_L
        HidKeyCode::KeyM => Some(50), // KEY_M
        HidKeyCode::KeyN => Some(49), // KEY_N
        HidKeyCode::KeyO => Some(24), // KEY_O
        HidKeyCode::KeyP => Some(25), // KEY_P
        HidKeyCode::KeyQ => Some(16), // KEY_Q
        HidKeyCode::KeyR => Some(19), // KEY_R
        HidKeyCode::KeyS => Some(31), // KEY_S
        HidKeyCode::KeyT => Some(20), // KEY_T
        HidKeyCode::KeyU => Some(22), // KEY_U
        HidKeyCode::KeyV => Some(47), // KEY_V
        HidKeyCode::KeyW => Some(17), // KEY_W
        HidKeyCode::KeyX => Some(45), // KEY_X
        HidKeyCode::KeyY => Some(21), // KEY_Y
        HidKeyCode::KeyZ => Some(44), // KEY_Z

        // Digits
        HidKeyCode::Digit1 => Some(2), // KEY_1
        HidKeyCode::Digit2 => Some(3), // KEY_2
        HidKeyCode::Digit3 => Some(4), // KEY_3
        HidKeyCode::Digit4 => Some(5), // KEY_4
        HidKeyCode::Digit5 => Some(6), // KEY_5
        HidKeyCode::Digit6 => Some(7), // KEY_6
        HidKeyCode::Digit7 => Some(8), // KEY_7
        HidKeyCode::Digit8 => Some(9), // KEY_8
        HidKeyCode::Digit9 => Some(10), // KEY_9
        HidKeyCode::Digit0 => Some(11), // KEY_0

        // Control and punctuation keys
        HidKeyCode::Enter => Some(28), // KEY_ENTER
        HidKeyCode::Escape => Some(1), // KEY_ESC
        HidKeyCode::Backspace => Some(14), // KEY_BACKSPACE
        HidKeyCode::Tab => Some(15), // KEY_TAB
        HidKeyCode::Space => Some(57), // KEY_SPACE
        HidKeyCode::Minus => Some(12), // KEY_MINUS
        HidKeyCode::Equal => Some(13), // KEY_EQUAL
        HidKeyCode::BracketLeft => Some(26), // KEY_LEFTBRACE
        HidKeyCode::BracketRight => Some(27), // KEY_RIGHTBRACE
        HidKeyCode::Backslash => Some(43), // KEY_BACKSLASH
        HidKeyCode::Semicolon => Some(39), // KEY_SEMICOLON
        HidKeyCode::Quote => Some(40), // KEY_APOSTROPHE
        HidKeyCode::Backquote => Some(41), // KEY_GRAVE
        HidKeyCode::Comma => Some(51), // KEY_COMMA
        HidKeyCode::Period => Some(52), // KEY_DOT
        HidKeyCode::Slash => Some(53), // KEY_SLASH
        HidKeyCode::CapsLock => Some(58), // KEY_CAPSLOCK

        // Function keys
        HidKeyCode::F1 => Some(59), // KEY_F1
        HidKeyCode::F2 => Some(60), // KEY_F2
        HidKeyCode::F3 => Some(61), // KEY_F3
        HidKeyCode::F4 => Some(62), // KEY_F4
        HidKeyCode::F5 => Some(63), // KEY_F5
        HidKeyCode::F6 => Some(64), // KEY_F6
        HidKeyCode::F7 => Some(65), // KEY_F7
        HidKeyCode::F8 => Some(66), // KEY_F8
        HidKeyCode::F9 => Some(67), // KEY_F9
        HidKeyCode::F10 => Some(68), // KEY_F10
        HidKeyCode::F11 => Some(87), // KEY_F11
        HidKeyCode::F12 => Some(88), // KEY_F12
        HidKeyCode::F13 => Some(183), // KEY_F13
        HidKeyCode::F14 => Some(184), // KEY_F14
        HidKeyCode::F15 => Some(185), // KEY_F15
        HidKeyCode::F16 => Some(186), // KEY_F16
        HidKeyCode::F17 => Some(187), // KEY_F17
        HidKeyCode::F18 => Some(188), // KEY_F18
        HidKeyCode::F19 => Some(189), // KEY_F19
        HidKeyCode::F20 => Some(190), // KEY_F20
        HidKeyCode::F21 => Some(191), // KEY_F21
        HidKeyCode::F22 => Some(192), // KEY_F22
        HidKeyCode::F23 => Some(193), // KEY_F23
        HidKeyCode::F24 => Some(194), // KEY_F24

        // Navigation cluster
        HidKeyCode::PrintScreen => Some(99), // KEY_SYSRQ
        HidKeyCode::ScrollLock => Some(70), // KEY_SCROLLLOCK
        HidKeyCode::Pause => Some(119), // KEY_PAUSE
        HidKeyCode::Insert => Some(110), // KEY_INSERT
        HidKeyCode::Home => Some(102), // KEY_HOME
        HidKeyCode::PageUp => Some(104), // KEY_PAGEUP
        HidKeyCode::Delete => Some(111), // KEY_DELETE
        HidKeyCode::End => Some(107), // KEY_END
        HidKeyCode::PageDown => Some(109), // KEY_PAGEDOWN
        HidKeyCode::ArrowRight => Some(106), // KEY_RIGHT
        HidKeyCode::ArrowLeft => Some(105), // KEY_LEFT
        HidKeyCode::ArrowDown => Some(108), // KEY_DOWN
        HidKeyCode::ArrowUp => Some(103), // KEY_UP

        // Numpad and application key
        HidKeyCode::NumLock => Some(69), // KEY_NUMLOCK
        HidKeyCode::NumpadDivide => Some(98), // KEY_KPSLASH
        HidKeyCode::NumpadMultiply => Some(55), // KEY_KPASTERISK
        HidKeyCode::NumpadSubtract => Some(74), // KEY_KPMINUS
        HidKeyCode::NumpadAdd => Some(78), // KEY_KPPLUS
        HidKeyCode::NumpadEnter => Some(96), // KEY_KPENTER
        HidKeyCode::Numpad1 => Some(79), // KEY_KP1
        HidKeyCode::Numpad2 => Some(80), // KEY_KP2
        HidKeyCode::Numpad3 => Some(81), // KEY_KP3
        HidKeyCode::Numpad4 => Some(75), // KEY_KP4
        HidKeyCode::Numpad5 => Some(76), // KEY_KP5
        HidKeyCode::Numpad6 => Some(77), // KEY_KP6
        HidKeyCode::Numpad7 => Some(71), // KEY_KP7
        HidKeyCode::Numpad8 => Some(72), // KEY_KP8
        HidKeyCode::Numpad9 => Some(73), // KEY_KP9
        HidKeyCode::Numpad0 => Some(82), // KEY_KP0
        HidKeyCode::NumpadDecimal => Some(83), // KEY_KPDOT
        HidKeyCode::ContextMenu => Some(127), // KEY_COMPOSE

        // Modifiers
        HidKeyCode::ControlLeft => Some(29), // KEY_LEFTCTRL
        HidKeyCode::ShiftLeft => Some(42), // KEY_LEFTSHIFT
        HidKeyCode::AltLeft => Some(56), // KEY_LEFTALT
        HidKeyCode::MetaLeft => Some(125), // KEY_LEFTMETA
        HidKeyCode::ControlRight => Some(97), // KEY_RIGHTCTRL
        HidKeyCode::ShiftRight => Some(54), // KEY_RIGHTSHIFT
        HidKeyCode::AltRight => Some(100), // KEY_RIGHTALT
        HidKeyCode::MetaRight => Some(126), // KEY_RIGHTMETA

        HidKeyCode::Unknown => None,
    }
}

/// Every HID usage the virtual keyboard must declare support for.
pub fn supported_evdev_codes() -> impl Iterator<Item = u16> {
    (0x00..=u8::MAX).filter_map(|raw| hid_to_evdev(HidKeyCode::from_u8(raw)))
}
