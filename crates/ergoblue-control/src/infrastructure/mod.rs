//! Infrastructure layer for the controller.
//!
//! Contains OS-facing adapters: HID output sinks, the L2CAP transport,
//! hidraw input enumeration, configuration storage and the system command
//! runner.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `ergoblue_core`, but MUST NOT be imported by the `application` layer
//! outside of its test doubles.

pub mod input_source;
pub mod output;
pub mod storage;
pub mod system;
pub mod transport;
