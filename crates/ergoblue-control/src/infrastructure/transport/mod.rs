//! Bluetooth transport: L2CAP listeners and the connection multiplexer.
//!
//! | Module        | Role                                                        |
//! |---------------|-------------------------------------------------------------|
//! | `address`     | Printable / wire forms of Bluetooth device addresses        |
//! | `multiplexer` | Per-connection routing, slots and report bridging           |
//! | `l2cap`       | Raw `AF_BLUETOOTH` sockets (Linux only)                     |
//! | `mock`        | In-memory listener and connections for tests                |
//!
//! The multiplexer only sees the [`multiplexer::ConnectionListener`] and
//! [`multiplexer::PeerConnection`] traits, so its routing rules are tested
//! without a Bluetooth adapter.

pub mod address;
pub mod mock;
pub mod multiplexer;

#[cfg(target_os = "linux")]
pub mod l2cap;
