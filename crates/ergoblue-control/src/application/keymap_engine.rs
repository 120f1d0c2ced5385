//! KeymapEngine: turns key-matrix edges into HID reports on the active host.
//!
//! This use case is the heart of the controller.  It owns the only mutable
//! session state in the process (held keys, current layer, lock, modifier
//! bookkeeping) and processes edges strictly one at a time, so report
//! emission and modifier bookkeeping never interleave.
//!
//! # How a key press is handled (for beginners)
//!
//! ```text
//! KeyEdge(position, pressed)
//!   │  release edge? ──► only remember it
//!   ▼
//! keymap.key_at(layer, position)
//!   │
//!   ▼
//! dispatch(key) ──► Desktop / Consumer ──► HidWriter of the active destination
//!   │           ──► Layer / Device / Function ──► session state only
//!   │           ──► Sequence / International / Unicode / Text ──► dispatch(..) again
//!   ▼
//! post-dispatch bookkeeping (one-shot layer and lock reset)
//! ```
//!
//! # Locks
//!
//! A single lock slot serves two purposes.  With [`Lock::Modifier`] set, the
//! next modifier pressed stays down until pressed again.  The power-off and
//! reboot keys use the same slot as a two-step guard: the first press arms
//! the lock, a second press while it is still armed runs the command.  Any
//! key that leaves the lock unchanged clears it again, so an armed command is
//! cancelled by pressing anything else.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ergoblue_core::{
    ascii_key, FunctionKey, HidKeyCode, Key, KeyEdge, KeyMatrixEvent, Keymap, Lock, Platform,
    SystemCommand, MATRIX_KEYS, ZERO_WIDTH_JOINER,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::application::device_registry::{Destination, DeviceRegistry, RegistryError};

/// Number of modifier usages (`0xE0..=0xE7`).
const MODIFIER_COUNT: usize = 8;

/// macOS ignores a Caps Lock tap shorter than this.
const MACOS_CAPS_LOCK_HOLD: Duration = Duration::from_millis(100);

/// Error type for running a guarded system command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no command configured for {0}")]
    NotConfigured(SystemCommand),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: SystemCommand,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed {
        command: SystemCommand,
        status: std::process::ExitStatus,
    },
}

/// Error type for the keymap engine.  Every variant is fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{command} command failed: {source}")]
    CommandFailed {
        command: SystemCommand,
        #[source]
        source: CommandError,
    },
}

/// Runs host-level commands such as power-off.
///
/// The infrastructure implementation spawns a process; tests use the
/// generated `MockSystemCommandRunner`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SystemCommandRunner: Send + Sync {
    async fn run(&self, command: SystemCommand) -> Result<(), CommandError>;
}

/// Handle to the Bluetooth multiplexer's temporary slots.
pub trait TemporaryConnections: Send + Sync {
    /// Drops every connection currently holding a temporary slot.
    fn reset(&self);
}

/// The per-controller mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Id of the active destination.
    pub device: String,
    /// Pressed state of every matrix position as of the last scan.
    pub keys: [bool; MATRIX_KEYS],
    pub layer: usize,
    /// The current layer reverts to 0 after the next key that keeps it.
    pub one_shot: bool,
    pub lock: Lock,
    /// Modifiers held on the active destination, indexed by `usage - 0xE0`.
    pub modifiers: [bool; MODIFIER_COUNT],
    /// Held modifiers that survive the release pass after ordinary keys.
    pub mod_locks: [bool; MODIFIER_COUNT],
}

impl SessionState {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            keys: [false; MATRIX_KEYS],
            layer: 0,
            one_shot: false,
            lock: Lock::None,
            modifiers: [false; MODIFIER_COUNT],
            mod_locks: [false; MODIFIER_COUNT],
        }
    }
}

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

/// Interprets key edges against the keymap and the active destination.
pub struct KeymapEngine {
    keymap: Arc<Keymap>,
    registry: DeviceRegistry,
    session: SessionState,
    commands: Arc<dyn SystemCommandRunner>,
    temporary: Arc<dyn TemporaryConnections>,
}

impl KeymapEngine {
    /// Creates the engine with `default_device` active.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Registry`] if the default destination or any
    /// device-switch key in the keymap names an unregistered destination.
    pub fn new(
        keymap: Arc<Keymap>,
        registry: DeviceRegistry,
        default_device: &str,
        commands: Arc<dyn SystemCommandRunner>,
        temporary: Arc<dyn TemporaryConnections>,
    ) -> Result<Self, EngineError> {
        registry.validate_keymap(&keymap)?;
        if !registry.contains(default_device) {
            return Err(RegistryError::UnknownDestination(default_device.to_string()).into());
        }

        Ok(Self {
            keymap,
            registry,
            session: SessionState::new(default_device),
            commands,
            temporary,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Processes scans until the channel closes or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns the first [`EngineError`]; the caller should exit.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<KeyMatrixEvent>,
    ) -> Result<(), EngineError> {
        info!(destination = %self.session.device, "keymap engine started");
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await?;
        }
        info!("input channel closed; keymap engine stopping");
        Ok(())
    }

    /// Decodes one half's scan and handles its edges in position order.
    pub async fn handle_event(&mut self, event: &KeyMatrixEvent) -> Result<(), EngineError> {
        let scan = event.decode();
        let edges: Vec<KeyEdge> = scan.edges(&self.session.keys).collect();
        for edge in edges {
            self.handle_edge(edge).await?;
        }
        Ok(())
    }

    /// Handles a single edge.
    ///
    /// Release edges only update the pressed bitset.  A press edge on a
    /// position already marked pressed is ignored.
    pub async fn handle_edge(&mut self, edge: KeyEdge) -> Result<(), EngineError> {
        let Some(&was_pressed) = self.session.keys.get(edge.position) else {
            return Ok(());
        };

        if edge.pressed && !was_pressed {
            let (layer, lock) = (self.session.layer, self.session.lock);
            let keymap = Arc::clone(&self.keymap);
            let key = keymap.key_at(layer, edge.position);
            trace!(position = edge.position, layer, ?key, "key pressed");

            self.dispatch(key).await?;

            // Layer keys and lock-setting keys change the value they guard,
            // so they are never cancelled by their own press.
            if self.session.layer == layer {
                if self.session.one_shot {
                    self.session.layer = 0;
                    self.session.one_shot = false;
                }
                if self.session.lock == lock {
                    self.session.lock = Lock::None;
                }
            }
        }

        self.session.keys[edge.position] = edge.pressed;
        Ok(())
    }

    fn dispatch<'a>(&'a mut self, key: &'a Key) -> DispatchFuture<'a> {
        Box::pin(async move {
            match key {
                Key::Empty => self.handle_code(HidKeyCode::Unknown).await,
                Key::Layer { layer, one_shot } => {
                    self.session.layer = *layer;
                    self.session.one_shot = *one_shot;
                    Ok(())
                }
                Key::Device(id) => self.switch_to(id).await,
                Key::Function(function) => self.run_function(*function).await,
                Key::Desktop { primary, alternate } => {
                    let code = self.active()?.select_code(*primary, *alternate);
                    self.handle_code(code).await
                }
                Key::Consumer(usage) => {
                    let writer = &mut self.active()?.writer;
                    writer.consumer(*usage).await;
                    writer.consumer(0).await;
                    self.handle_code(HidKeyCode::Unknown).await
                }
                Key::Sequence(keys) => {
                    for key in keys {
                        self.dispatch(key).await?;
                    }
                    Ok(())
                }
                Key::International { primary, macos } => {
                    let variant = match self.active()?.platform {
                        Platform::Android | Platform::Linux | Platform::Windows => primary,
                        Platform::MacOs => macos,
                    };
                    self.dispatch(variant).await
                }
                Key::Unicode(ch) => self.type_unicode(*ch).await,
                Key::UnicodeCompound(chars) => {
                    for (i, ch) in chars.iter().enumerate() {
                        if i > 0 {
                            self.type_unicode(ZERO_WIDTH_JOINER).await?;
                        }
                        self.type_unicode(*ch).await?;
                    }
                    Ok(())
                }
                Key::Text(text) => self.type_text(text).await,
            }
        })
    }

    fn active(&mut self) -> Result<&mut Destination, EngineError> {
        Ok(self.registry.resolve(&self.session.device)?)
    }

    /// Modifiers toggle.  Any other code is tapped, then every modifier that
    /// is not locked is released.  [`HidKeyCode::Unknown`] only releases.
    async fn handle_code(&mut self, code: HidKeyCode) -> Result<(), EngineError> {
        if let Some(index) = code.modifier_index() {
            if self.session.modifiers[index] {
                self.release_modifier(index).await?;
            } else {
                self.active()?.writer.press(code).await;
                self.session.modifiers[index] = true;
                self.session.mod_locks[index] = self.session.lock == Lock::Modifier;
            }
            return Ok(());
        }

        if code != HidKeyCode::Unknown {
            let destination = self.active()?;
            destination.writer.press(code).await;
            if code == HidKeyCode::CapsLock && destination.platform == Platform::MacOs {
                tokio::time::sleep(MACOS_CAPS_LOCK_HOLD).await;
            }
            destination.writer.release(code).await;
        }

        self.release_unlocked_modifiers().await
    }

    async fn release_modifier(&mut self, index: usize) -> Result<(), EngineError> {
        if let Some(code) = HidKeyCode::from_modifier_index(index) {
            self.active()?.writer.release(code).await;
        }
        self.session.modifiers[index] = false;
        self.session.mod_locks[index] = false;
        Ok(())
    }

    async fn release_unlocked_modifiers(&mut self) -> Result<(), EngineError> {
        for index in 0..MODIFIER_COUNT {
            if self.session.modifiers[index] && !self.session.mod_locks[index] {
                self.release_modifier(index).await?;
            }
        }
        Ok(())
    }

    /// Releases every held modifier on the current destination, locked or
    /// not, then makes `id` active.
    async fn switch_to(&mut self, id: &str) -> Result<(), EngineError> {
        if !self.registry.contains(id) {
            return Err(RegistryError::UnknownDestination(id.to_string()).into());
        }
        for index in 0..MODIFIER_COUNT {
            if self.session.modifiers[index] {
                self.release_modifier(index).await?;
            }
        }
        info!(from = %self.session.device, to = %id, "switching destination");
        self.session.device = id.to_string();
        Ok(())
    }

    async fn run_function(&mut self, function: FunctionKey) -> Result<(), EngineError> {
        if let Some((guard, command)) = function.guard() {
            if self.session.lock != guard {
                info!(%command, "armed; press again to confirm");
                self.session.lock = guard;
                return Ok(());
            }
            info!(%command, "confirmed; running system command");
            return self.commands.run(command).await.map_err(|source| {
                error!(%command, error = %source, "system command failed");
                EngineError::CommandFailed { command, source }
            });
        }

        match function {
            FunctionKey::ToggleModifierLock => {
                self.session.lock = match self.session.lock {
                    Lock::Modifier => Lock::None,
                    _ => Lock::Modifier,
                };
                debug!(lock = ?self.session.lock, "modifier lock toggled");
            }
            FunctionKey::ResetTemporaryConnections => {
                info!("resetting temporary connections");
                self.temporary.reset();
            }
            FunctionKey::PowerOff | FunctionKey::Reboot => {}
        }
        Ok(())
    }

    /// Types `ch` with the host's Unicode entry method (`Ctrl+Shift+U`, hex
    /// digits, space).  Only Linux hosts support it; elsewhere this behaves
    /// like an unbound key.
    async fn type_unicode(&mut self, ch: char) -> Result<(), EngineError> {
        if self.active()?.platform != Platform::Linux {
            return self.handle_code(HidKeyCode::Unknown).await;
        }

        let entry = Key::sequence([
            Key::desktop(HidKeyCode::ControlLeft),
            Key::desktop(HidKeyCode::ShiftLeft),
            Key::text("u"),
        ]);
        self.dispatch(&entry).await?;
        self.type_text(&format!("{:x}", u32::from(ch))).await?;
        self.dispatch(&Key::desktop(HidKeyCode::Space)).await
    }

    /// Types each character that has a key; others are skipped.
    async fn type_text(&mut self, text: &str) -> Result<(), EngineError> {
        for ch in text.chars() {
            match ascii_key(ch) {
                Some(key) => self.dispatch(&key).await?,
                None => trace!(?ch, "character has no key; skipped"),
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
