//! Printable ASCII to key lookup, used for string macros.
//!
//! The keyboard types Colemak.  Letters whose Colemak position differs from
//! QWERTY carry the QWERTY code as the alternate, so hosts set to the
//! alternate layout still receive the intended character.

use crate::domain::key::Key;
use crate::keymap::hid::HidKeyCode;

/// Key that types `ch`, or `None` if the character cannot be typed.
///
/// Covers `' '..='~'` plus newline (Enter) and tab (Tab).  Shifted
/// characters are returned as `Sequence[LShift, key]`.
pub fn ascii_key(ch: char) -> Option<Key> {
    use HidKeyCode::*;

    let (code, shift) = match ch {
        '\n' => return Some(Key::desktop(Enter)),
        '\t' => return Some(Key::desktop(Tab)),
        'a'..='z' => return Some(letter(ch)),
        'A'..='Z' => return Some(Key::shifted(letter(ch.to_ascii_lowercase()))),
        ';' => return Some(semicolon()),
        ':' => return Some(Key::shifted(semicolon())),
        ' ' => (Space, false),
        '1' => (Digit1, false),
        '2' => (Digit2, false),
        '3' => (Digit3, false),
        '4' => (Digit4, false),
        '5' => (Digit5, false),
        '6' => (Digit6, false),
        '7' => (Digit7, false),
        '8' => (Digit8, false),
        '9' => (Digit9, false),
        '0' => (Digit0, false),
        '!' => (Digit1, true),
        '@' => (Digit2, true),
        '#' => (Digit3, true),
        '$' => (Digit4, true),
        '%' => (Digit5, true),
        '^' => (Digit6, true),
        '&' => (Digit7, true),
        '*' => (Digit8, true),
        '(' => (Digit9, true),
        ')' => (Digit0, true),
        '\'' => (Quote, false),
        '"' => (Quote, true),
        ',' => (Comma, false),
        '<' => (Comma, true),
        '.' => (Period, false),
        '>' => (Period, true),
        '/' => (Slash, false),
        '?' => (Slash, true),
        '-' => (Minus, false),
        '_' => (Minus, true),
        '=' => (Equal, false),
        '+' => (Equal, true),
        '[' => (BracketLeft, false),
        '{' => (BracketLeft, true),
        ']' => (BracketRight, false),
        '}' => (BracketRight, true),
        '\\' => (Backslash, false),
        '|' => (Backslash, true),
        '`' => (Backquote, false),
        '~' => (Backquote, true),
        _ => return None,
    };

    let key = Key::desktop(code);
    Some(if shift { Key::shifted(key) } else { key })
}

/// Lowercase Colemak letter with its QWERTY position as the alternate.
fn letter(ch: char) -> Key {
    use HidKeyCode::*;

    match ch {
        'd' => Key::layout(KeyD, KeyG),
        'e' => Key::layout(KeyE, KeyK),
        'f' => Key::layout(KeyF, KeyE),
        'g' => Key::layout(KeyG, KeyT),
        'i' => Key::layout(KeyI, KeyL),
        'j' => Key::layout(KeyJ, KeyY),
        'k' => Key::layout(KeyK, KeyN),
        'l' => Key::layout(KeyL, KeyU),
        'n' => Key::layout(KeyN, KeyJ),
        'o' => Key::layout(KeyO, Semicolon),
        'p' => Key::layout(KeyP, KeyR),
        'r' => Key::layout(KeyR, KeyS),
        's' => Key::layout(KeyS, KeyD),
        't' => Key::layout(KeyT, KeyF),
        'u' => Key::layout(KeyU, KeyI),
        'y' => Key::layout(KeyY, KeyO),
        // a b c h m q v w x z sit in the same place on both layouts
        other => {
            let offset = u8::try_from(other).map_or(0, |b| b.wrapping_sub(b'a'));
            Key::desktop(HidKeyCode::from_u8(KeyA.as_u8() + offset))
        }
    }
}

fn semicolon() -> Key {
    Key::layout(HidKeyCode::Semicolon, HidKeyCode::KeyP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_printable_character_is_mapped() {
        for ch in ' '..='~' {
            assert!(ascii_key(ch).is_some(), "{ch:?} has no key");
        }
    }

    #[test]
    fn test_control_characters_other_than_newline_and_tab_are_unmapped() {
        assert_eq!(ascii_key('\r'), None);
        assert_eq!(ascii_key('\u{7f}'), None);
        assert_eq!(ascii_key('ñ'), None);
        assert_eq!(ascii_key('\n'), Some(Key::desktop(HidKeyCode::Enter)));
        assert_eq!(ascii_key('\t'), Some(Key::desktop(HidKeyCode::Tab)));
    }

    #[test]
    fn test_uppercase_is_shifted_lowercase() {
        assert_eq!(
            ascii_key('H'),
            Some(Key::shifted(Key::desktop(HidKeyCode::KeyH)))
        );
    }

    #[test]
    fn test_colemak_letters_carry_qwerty_alternate() {
        assert_eq!(
            ascii_key('f'),
            Some(Key::layout(HidKeyCode::KeyF, HidKeyCode::KeyE))
        );
        assert_eq!(
            ascii_key('o'),
            Some(Key::layout(HidKeyCode::KeyO, HidKeyCode::Semicolon))
        );
    }

    #[test]
    fn test_shared_letters_have_no_alternate() {
        for (ch, code) in [
            ('a', HidKeyCode::KeyA),
            ('b', HidKeyCode::KeyB),
            ('m', HidKeyCode::KeyM),
            ('q', HidKeyCode::KeyQ),
            ('z', HidKeyCode::KeyZ),
        ] {
            assert_eq!(ascii_key(ch), Some(Key::desktop(code)));
        }
    }

    #[test]
    fn test_symbols_use_their_shifted_digit() {
        assert_eq!(
            ascii_key('&'),
            Some(Key::shifted(Key::desktop(HidKeyCode::Digit7)))
        );
        assert_eq!(
            ascii_key(':'),
            Some(Key::shifted(Key::layout(HidKeyCode::Semicolon, HidKeyCode::KeyP)))
        );
    }
}
