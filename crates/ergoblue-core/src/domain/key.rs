//! Key definitions: what pressing a matrix position means.
//!
//! A [`Key`] is pure data.  Interpreting it (emitting reports, switching
//! layers, running commands) is the keymap engine's job; this module only
//! describes the closed set of things a key can be.

use std::fmt;

use crate::keymap::hid::HidKeyCode;

/// Zero-width joiner inserted between the parts of a compound emoji.
pub const ZERO_WIDTH_JOINER: char = '\u{200D}';

/// Session-wide guard value.
///
/// The same slot serves sticky modifiers and the two-step confirmation of
/// destructive commands, so arming one disarms the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lock {
    #[default]
    None,
    /// Modifiers pressed while set stay down until pressed again.
    Modifier,
    PowerOffArmed,
    RebootArmed,
}

/// External host actions a key can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCommand {
    PowerOff,
    Reboot,
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemCommand::PowerOff => f.write_str("power-off"),
            SystemCommand::Reboot => f.write_str("reboot"),
        }
    }
}

/// Keys with custom behaviour beyond sending codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    /// Toggles [`Lock::Modifier`].
    ToggleModifierLock,
    /// Drops every Bluetooth connection holding a temporary slot.
    ResetTemporaryConnections,
    /// Arms, then on a second press runs, [`SystemCommand::PowerOff`].
    PowerOff,
    /// Arms, then on a second press runs, [`SystemCommand::Reboot`].
    Reboot,
}

impl FunctionKey {
    /// The lock that must already be set for the command to run, and the
    /// command itself.  `None` for keys that are not guarded.
    pub fn guard(self) -> Option<(Lock, SystemCommand)> {
        match self {
            FunctionKey::PowerOff => Some((Lock::PowerOffArmed, SystemCommand::PowerOff)),
            FunctionKey::Reboot => Some((Lock::RebootArmed, SystemCommand::Reboot)),
            FunctionKey::ToggleModifierLock | FunctionKey::ResetTemporaryConnections => None,
        }
    }
}

/// Everything a matrix position can be bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Unbound position: sends nothing but releases unlocked modifiers.
    Empty,
    /// Selects `layer`; a one-shot layer falls back to layer 0 after the next key.
    Layer { layer: usize, one_shot: bool },
    /// Makes the named destination the active output.
    Device(String),
    Function(FunctionKey),
    /// A keyboard-page code.  `alternate` is sent instead of `primary` to
    /// destinations flagged with an alternate layout, unless it is
    /// [`HidKeyCode::Unknown`].
    Desktop {
        primary: HidKeyCode,
        alternate: HidKeyCode,
    },
    /// A consumer-page usage such as volume up.
    Consumer(u16),
    /// Dispatches each key in order.
    Sequence(Vec<Key>),
    /// `macos` on macOS destinations, `primary` everywhere else.
    International { primary: Box<Key>, macos: Box<Key> },
    /// A Unicode character typed through the host's Unicode entry method.
    Unicode(char),
    /// Several codepoints joined with [`ZERO_WIDTH_JOINER`].
    UnicodeCompound(Vec<char>),
    /// A string macro typed character by character.
    Text(String),
}

impl Key {
    /// A keyboard key that is the same on every layout.
    pub fn desktop(code: HidKeyCode) -> Self {
        Key::Desktop {
            primary: code,
            alternate: HidKeyCode::Unknown,
        }
    }

    /// A keyboard key that moves on alternate-layout hosts.
    pub fn layout(primary: HidKeyCode, alternate: HidKeyCode) -> Self {
        Key::Desktop { primary, alternate }
    }

    /// `key` with Left Shift toggled on first.
    pub fn shifted(key: Key) -> Self {
        Key::Sequence(vec![Key::desktop(HidKeyCode::ShiftLeft), key])
    }

    pub fn sequence(keys: impl IntoIterator<Item = Key>) -> Self {
        Key::Sequence(keys.into_iter().collect())
    }

    pub fn international(primary: Key, macos: Key) -> Self {
        Key::International {
            primary: Box::new(primary),
            macos: Box::new(macos),
        }
    }

    pub fn layer(layer: usize, one_shot: bool) -> Self {
        Key::Layer { layer, one_shot }
    }

    pub fn device(id: impl Into<String>) -> Self {
        Key::Device(id.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Key::Text(text.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Key::Empty)
    }

    /// Calls `visit` on this key and every key nested inside it.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Key)) {
        visit(self);
        match self {
            Key::Sequence(keys) => keys.iter().for_each(|k| k.walk(visit)),
            Key::International { primary, macos } => {
                primary.walk(visit);
                macos.walk(visit);
            }
            _ => {}
        }
    }
}
