//! Output sinks: where encoded HID reports go.
//!
//! Every destination is backed by one [`ReportSink`]:
//!
//! | Transport   | Sink                          | Delivery                        |
//! |-------------|-------------------------------|---------------------------------|
//! | `gadget`    | [`gadget::GadgetSink`]        | non-blocking write to `/dev/hidg0` |
//! | `uinput`    | [`uinput::UinputSink`]        | key events on a virtual keyboard |
//! | `bluetooth` | [`bluetooth::BluetoothSink`]  | bounded queue drained by an L2CAP bridge |
//!
//! All sinks honour a short write deadline: a report that cannot be
//! delivered in time is dropped, never retried.
//!
//! [`ReportSink`]: crate::application::device_registry::ReportSink

pub mod bluetooth;
pub mod mock;

#[cfg(target_os = "linux")]
pub mod gadget;
#[cfg(target_os = "linux")]
pub mod uinput;
