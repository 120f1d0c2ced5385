//! Application layer use cases for the controller.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure keymap and report rules in `ergoblue-core`) and the infrastructure
//! (device files, Bluetooth sockets, child processes).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "turn this
//!   key press into HID reports on the selected host").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the infrastructure can be swapped without changing this code.
//! - **Contain no OS calls**: sinks, command runners and input sources are
//!   injected.
//!
//! # Sub-modules
//!
//! - **`keymap_engine`** – Owns the session state and interprets every key
//!   press against the active layer and destination.  This is the most
//!   critical use case: it runs on every key edge.
//!
//! - **`device_registry`** – The fixed set of output destinations and the
//!   per-destination HID writer that tracks held keys and modifiers.
//!
//! - **`input_pipeline`** – Reads raw scans from each physical half and
//!   funnels them into the engine's single event queue.

pub mod device_registry;
pub mod input_pipeline;
pub mod keymap_engine;
