//! Storage infrastructure: the controller's configuration file.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the path given on the command
//!   line.
//! - Providing the built-in defaults when the file does not exist, so a
//!   freshly imaged controller works out of the box.
//! - Validating the destination list before anything is opened.
//!
//! The controller never writes the file back.

pub mod config;
