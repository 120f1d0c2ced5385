//! Domain entities for the ErgoBlue controller.
//!
//! This module contains pure logic with no infrastructure dependencies: how a
//! raw scan becomes key positions, what a key is, and which keys sit where.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is the **domain**.  Domain code has **no** imports from OS APIs,
//! sockets, device files or async runtimes, so it compiles and tests anywhere.
//! The controller crate's application and infrastructure layers depend on the
//! domain; the domain never depends on them.

pub mod ascii;
pub mod default_layers;
pub mod key;
pub mod keymap;
pub mod matrix;
pub mod platform;
