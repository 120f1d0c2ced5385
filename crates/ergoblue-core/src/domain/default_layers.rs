//! The ErgoBlue keymap: a Colemak base layer plus function, symbol and
//! number-pad layers.
//!
//! Each layer is written half by half, one matrix row per line, in the
//! position order described in [`crate::domain::matrix`].  Row lengths are
//! 7, 7, 6, 7, 5, 6 on both halves.

use crate::domain::ascii::ascii_key;
use crate::domain::key::{FunctionKey, Key};
use crate::domain::keymap::{Keymap, KeymapError, Layer};
use crate::keymap::hid::{HidKeyCode, CONSUMER_MUTE, CONSUMER_VOLUME_DOWN, CONSUMER_VOLUME_UP};

/// Unbound position.
const NOP: Key = Key::Empty;

/// Builds the four ErgoBlue layers.
///
/// # Errors
///
/// Never fails for the built-in table; the `Result` comes from
/// [`Keymap::new`]'s validation.
pub fn ergoblue_keymap() -> Result<Keymap, KeymapError> {
    Keymap::new(vec![main_layer(), function_layer(), symbol_layer(), numpad_layer()])
}

#[rustfmt::skip]
fn main_layer() -> Layer {
    Layer::new([
        // Left half
        NOP, ch('1'), ch('2'), ch('3'), ch('4'), ch('5'), d(HidKeyCode::PrintScreen),
        d(HidKeyCode::Tab), ch('q'), ch('w'), ch('f'), ch('p'), ch('g'), d(HidKeyCode::CapsLock),
        d(HidKeyCode::Escape), ch('a'), ch('r'), ch('s'), ch('t'), ch('d'),
        Key::layer(2, true), ch('z'), ch('x'), ch('c'), ch('v'), ch('b'), Key::Consumer(CONSUMER_VOLUME_DOWN),
        NOP, NOP, d(HidKeyCode::AltLeft), d(HidKeyCode::ArrowLeft), d(HidKeyCode::ArrowDown),
        d(HidKeyCode::MetaLeft), d(HidKeyCode::PageUp), d(HidKeyCode::ControlLeft), d(HidKeyCode::Space), home(), d(HidKeyCode::Delete),
        // Right half
        firefox_menu(), ch('6'), ch('7'), ch('8'), ch('9'), ch('0'), d(HidKeyCode::ContextMenu),
        Key::Consumer(CONSUMER_MUTE), ch('j'), ch('l'), ch('u'), ch('y'), ch(';'), ch('\\'),
        ch('h'), ch('n'), ch('e'), ch('i'), ch('o'), d(HidKeyCode::Backspace),
        Key::Consumer(CONSUMER_VOLUME_UP), ch('k'), ch('m'), ch(','), ch('.'), ch('/'), Key::layer(2, true),
        d(HidKeyCode::ArrowUp), d(HidKeyCode::ArrowRight), d(HidKeyCode::AltLeft), Key::Function(FunctionKey::ToggleModifierLock), Key::layer(3, false),
        d(HidKeyCode::Insert), end(), d(HidKeyCode::Enter), d(HidKeyCode::ShiftLeft), d(HidKeyCode::PageDown), Key::layer(1, true),
    ])
}

/// F1–F24 and destination switching.
#[rustfmt::skip]
fn function_layer() -> Layer {
    Layer::new([
        // Left half
        NOP, Key::device("abc123"), Key::device("def123"), Key::device("ghi123"), Key::device("jkl123"), Key::device("uin123"), NOP,
        NOP, d(HidKeyCode::F1), d(HidKeyCode::F2), d(HidKeyCode::F3), d(HidKeyCode::F4), NOP, NOP,
        NOP, d(HidKeyCode::F5), d(HidKeyCode::F6), d(HidKeyCode::F7), d(HidKeyCode::F8), NOP,
        NOP, d(HidKeyCode::F9), d(HidKeyCode::F10), d(HidKeyCode::F11), d(HidKeyCode::F12), NOP, NOP,
        NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, Key::Function(FunctionKey::ResetTemporaryConnections), Key::device("tmp123"), NOP, NOP,
        // Right half
        NOP, Key::device("mno123"), NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, d(HidKeyCode::F13), d(HidKeyCode::F14), d(HidKeyCode::F15), d(HidKeyCode::F16), NOP,
        NOP, d(HidKeyCode::F17), d(HidKeyCode::F18), d(HidKeyCode::F19), d(HidKeyCode::F20), NOP,
        NOP, NOP, d(HidKeyCode::F21), d(HidKeyCode::F22), d(HidKeyCode::F23), d(HidKeyCode::F24), NOP,
        NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, NOP, NOP, NOP, NOP,
    ])
}

/// Symbols, Spanish characters, emoji and the guarded power keys.
#[rustfmt::skip]
fn symbol_layer() -> Layer {
    Layer::new([
        // Left half
        Key::Function(FunctionKey::PowerOff), Key::Unicode('\u{1F604}'), Key::Unicode('\u{1F622}'), Key::Unicode('\u{1F602}'), Key::Unicode('\u{1F605}'), Key::Unicode('\u{1F600}'), NOP,
        NOP, NOP, inverted_exclamation(), ch('~'), ch('`'), ch('#'), NOP,
        NOP, accented('a'), ch('!'), ch('+'), ch('='), ch('$'),
        NOP, inverted_question(), ch('@'), ch('['), ch(']'), ch('%'), NOP,
        NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, ch('"'), ch('\''), NOP, NOP,
        // Right half
        NOP, Key::Unicode('\u{1F44D}'), Key::Unicode('\u{1F914}'), Key::Unicode('\u{1F609}'), Key::Unicode('\u{1F621}'), Key::UnicodeCompound(vec!['\u{1F926}', '\u{2642}']), Key::Function(FunctionKey::Reboot),
        NOP, ch('^'), u_diaeresis(), accented('u'), NOP, NOP, NOP,
        ch('&'), n_tilde(), accented('e'), accented('i'), accented('o'), NOP,
        NOP, ch('*'), ch('-'), ch('_'), ch('{'), ch('}'), NOP,
        NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, ch(')'), ch('('), NOP, NOP,
    ])
}

#[rustfmt::skip]
fn numpad_layer() -> Layer {
    Layer::new([
        // Left half
        NOP, NOP, NOP, NOP, NOP, NOP, NOP,
        d(HidKeyCode::Tab), NOP, NOP, NOP, NOP, NOP, NOP,
        NOP, ch('/'), ch('*'), ch('-'), ch('+'), NOP,
        NOP, NOP, NOP, ch('='), ch('.'), NOP, NOP,
        NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, d(HidKeyCode::ControlLeft), d(HidKeyCode::Space), NOP, NOP,
        // Right half
        NOP, NOP, NOP, NOP, NOP, NOP, NOP,
        NOP, NOP, ch('7'), ch('8'), ch('9'), ch(':'), NOP,
        NOP, ch('4'), ch('5'), ch('6'), ch('0'), d(HidKeyCode::Backspace),
        NOP, NOP, ch('1'), ch('2'), ch('3'), NOP, NOP,
        NOP, NOP, NOP, NOP, Key::layer(0, false),
        NOP, NOP, d(HidKeyCode::Enter), d(HidKeyCode::ShiftLeft), NOP, NOP,
    ])
}

fn d(code: HidKeyCode) -> Key {
    Key::desktop(code)
}

fn ch(c: char) -> Key {
    ascii_key(c).unwrap_or(Key::Empty)
}

/// Home is GUI+Left on macOS.
fn home() -> Key {
    Key::international(
        d(HidKeyCode::Home),
        Key::sequence([d(HidKeyCode::MetaLeft), d(HidKeyCode::ArrowLeft)]),
    )
}

/// End is GUI+Right on macOS.
fn end() -> Key {
    Key::international(
        d(HidKeyCode::End),
        Key::sequence([d(HidKeyCode::MetaLeft), d(HidKeyCode::ArrowRight)]),
    )
}

/// Opens the Firefox tab list: Ctrl+L, Shift+Tab twice, then the menu key.
fn firefox_menu() -> Key {
    Key::sequence([
        d(HidKeyCode::ControlLeft),
        ch('l'),
        d(HidKeyCode::ShiftLeft),
        d(HidKeyCode::Tab),
        d(HidKeyCode::ShiftLeft),
        d(HidKeyCode::Tab),
        d(HidKeyCode::ContextMenu),
    ])
}

/// Acute-accented vowel: AltGr+vowel, or the macOS `Option+e` dead key.
fn accented(vowel: char) -> Key {
    Key::international(
        Key::sequence([d(HidKeyCode::AltRight), ch(vowel)]),
        Key::sequence([d(HidKeyCode::AltLeft), ch('e'), ch(vowel)]),
    )
}

fn n_tilde() -> Key {
    Key::international(
        Key::sequence([d(HidKeyCode::AltRight), ch('n')]),
        Key::sequence([d(HidKeyCode::AltLeft), ch('n'), ch('n')]),
    )
}

fn u_diaeresis() -> Key {
    Key::international(
        Key::sequence([d(HidKeyCode::AltRight), ch('y')]),
        Key::sequence([d(HidKeyCode::AltLeft), ch('u'), ch('u')]),
    )
}

fn inverted_exclamation() -> Key {
    Key::international(
        Key::sequence([d(HidKeyCode::AltRight), d(HidKeyCode::ShiftLeft), ch('1')]),
        Key::sequence([d(HidKeyCode::AltLeft), ch('1')]),
    )
}

fn inverted_question() -> Key {
    Key::international(
        Key::sequence([d(HidKeyCode::AltRight), ch('/')]),
        Key::sequence([d(HidKeyCode::AltLeft), d(HidKeyCode::ShiftLeft), ch('/')]),
    )
}
