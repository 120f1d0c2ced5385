//! Output destinations and the per-destination HID writer.
//!
//! A *destination* is one host the keyboard can type into: the USB gadget
//! port, the controller's own virtual keyboard, or a paired Bluetooth host.
//! Each destination owns a [`HidWriter`] that remembers which keys and
//! modifiers that host currently sees as held, so switching hosts never
//! leaks key state from one to another.
//!
//! # Report flow (for beginners)
//!
//! ```text
//! KeymapEngine ──press/release──► HidWriter ──encoded bytes──► ReportSink
//!                                 (held keys,                  (gadget file,
//!                                  modifier byte)               uinput, BT queue)
//! ```
//!
//! Sinks are best-effort: a write that cannot finish within its deadline is
//! dropped and logged, never retried.  A lost key event is preferable to a
//! stalled keyboard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ergoblue_core::report::MAX_PRESSED_KEYS;
use ergoblue_core::{HidKeyCode, HidReport, Keymap, Platform};
use thiserror::Error;
use tracing::{debug, trace};

/// Error returned by a [`ReportSink`] when a report could not be delivered.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The report was not accepted before the write deadline.
    #[error("write did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    /// Nothing is reading from the destination any more.
    #[error("destination is disconnected")]
    Disconnected,

    /// The underlying device rejected the write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for registry lookups and registration.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("destination registered twice: {0}")]
    DuplicateDestination(String),
}

/// Anything that accepts encoded HID reports for one destination.
///
/// Implementations must honour a short write deadline and never block the
/// caller indefinitely.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Delivers one encoded report, returning the number of bytes accepted.
    async fn write(&self, report: &[u8]) -> Result<usize, SinkError>;
}

/// Tracks the keyboard state one destination sees and emits reports for it.
///
/// Held keys keep their insertion order, and at most
/// [`MAX_PRESSED_KEYS`] are reported at once.
pub struct HidWriter {
    sink: Arc<dyn ReportSink>,
    modifiers: u8,
    keys: Vec<HidKeyCode>,
}

impl HidWriter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            modifiers: 0,
            keys: Vec::with_capacity(MAX_PRESSED_KEYS),
        }
    }

    /// Current modifier byte (bit `n` = usage `0xE0 + n`).
    pub fn modifiers(&self) -> u8 {
        self.modifiers
    }

    /// Non-modifier keys currently held, oldest first.
    pub fn held_keys(&self) -> &[HidKeyCode] {
        &self.keys
    }

    /// Marks `code` as held and sends a keyboard report.
    ///
    /// When six keys are already held the press is ignored and nothing is
    /// sent.
    pub async fn press(&mut self, code: HidKeyCode) {
        if let Some(index) = code.modifier_index() {
            self.modifiers |= 1 << index;
        } else if self.keys.len() >= MAX_PRESSED_KEYS {
            trace!(key = ?code, "key rollover limit reached; press ignored");
            return;
        } else if !self.keys.contains(&code) {
            self.keys.push(code);
        }
        self.write_desktop().await;
    }

    /// Marks `code` as released and sends a keyboard report.
    ///
    /// Releasing a key that is not held sends nothing.
    pub async fn release(&mut self, code: HidKeyCode) {
        if let Some(index) = code.modifier_index() {
            self.modifiers &= !(1 << index);
        } else if let Some(slot) = self.keys.iter().position(|k| *k == code) {
            self.keys.remove(slot);
        } else {
            return;
        }
        self.write_desktop().await;
    }

    /// Sends a consumer-control report carrying `usage` (0 = nothing pressed).
    pub async fn consumer(&mut self, usage: u16) {
        let report = HidReport::consumer(usage).encode();
        self.send(&report).await;
    }

    async fn write_desktop(&mut self) {
        let report = HidReport::desktop(self.modifiers, &self.keys).encode();
        self.send(&report).await;
    }

    async fn send(&self, report: &[u8]) {
        if let Err(e) = self.sink.write(report).await {
            debug!(error = %e, "report dropped");
        }
    }
}

/// One host the keyboard can type into.
pub struct Destination {
    pub id: String,
    pub platform: Platform,
    /// The host itself is set to Colemak, so keys go out as the QWERTY
    /// positions it maps back.
    pub alternate_layout: bool,
    pub writer: HidWriter,
}

impl Destination {
    pub fn new(
        id: impl Into<String>,
        platform: Platform,
        alternate_layout: bool,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            id: id.into(),
            platform,
            alternate_layout,
            writer: HidWriter::new(sink),
        }
    }

    /// The code this host should receive for a key with the given primary
    /// and alternate codes.
    pub fn select_code(&self, primary: HidKeyCode, alternate: HidKeyCode) -> HidKeyCode {
        if self.alternate_layout && alternate != HidKeyCode::Unknown {
            alternate
        } else {
            primary
        }
    }
}

/// The fixed set of destinations, keyed by id.
///
/// Populated once at startup and owned by the keymap engine afterwards.
#[derive(Default)]
pub struct DeviceRegistry {
    destinations: HashMap<String, Destination>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a destination.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDestination`] if the id is taken.
    pub fn register(&mut self, destination: Destination) -> Result<(), RegistryError> {
        if self.destinations.contains_key(&destination.id) {
            return Err(RegistryError::DuplicateDestination(destination.id));
        }
        self.destinations
            .insert(destination.id.clone(), destination);
        Ok(())
    }

    /// Looks up a destination for writing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownDestination`] for ids that were never
    /// registered.  This is a configuration error, not a runtime condition.
    pub fn resolve(&mut self, id: &str) -> Result<&mut Destination, RegistryError> {
        self.destinations
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownDestination(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Destination> {
        self.destinations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.destinations.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.destinations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Checks that every device-switch key in `keymap` names a registered
    /// destination.
    ///
    /// # Errors
    ///
    /// Returns the first unknown id as [`RegistryError::UnknownDestination`].
    pub fn validate_keymap(&self, keymap: &Keymap) -> Result<(), RegistryError> {
        match keymap.destinations().into_iter().find(|id| !self.contains(id)) {
            Some(id) => Err(RegistryError::UnknownDestination(id.to_string())),
            None => Ok(()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
