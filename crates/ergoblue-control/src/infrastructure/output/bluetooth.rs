//! Report sink for Bluetooth hosts.
//!
//! A Bluetooth destination has no socket of its own.  Its sink offers each
//! framed report to a single-slot queue; whichever L2CAP interrupt bridge is
//! currently serving that host drains the queue onto the wire (see
//! [`crate::infrastructure::transport::multiplexer`]).  When no host is
//! connected nobody drains the queue, the offer times out, and the report is
//! dropped.

use std::time::Duration;

use async_trait::async_trait;
use ergoblue_core::report::frame_for_bluetooth;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

use crate::application::device_registry::{ReportSink, SinkError};

/// Frames waiting for an interrupt bridge.  Capacity 1: a report is either
/// picked up promptly or dropped.
pub const QUEUE_CAPACITY: usize = 1;

/// Sending half of a Bluetooth destination's frame queue.
pub type FrameSender = mpsc::Sender<Vec<u8>>;
/// Receiving half, handed to the transport multiplexer.
pub type FrameReceiver = mpsc::Receiver<Vec<u8>>;

/// Sink that hands HIDP-framed reports to the transport multiplexer.
pub struct BluetoothSink {
    queue: FrameSender,
    deadline: Duration,
}

impl BluetoothSink {
    pub fn new(queue: FrameSender, deadline: Duration) -> Self {
        Self { queue, deadline }
    }

    /// Creates a sink together with the receiver its frames arrive on.
    pub fn with_queue(deadline: Duration) -> (Self, FrameReceiver) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self::new(tx, deadline), rx)
    }
}

#[async_trait]
impl ReportSink for BluetoothSink {
    async fn write(&self, report: &[u8]) -> Result<usize, SinkError> {
        let frame = frame_for_bluetooth(report);
        match self.queue.send_timeout(frame, self.deadline).await {
            Ok(()) => Ok(report.len()),
            Err(SendTimeoutError::Timeout(_)) => Err(SinkError::DeadlineExceeded(self.deadline)),
            Err(SendTimeoutError::Closed(_)) => Err(SinkError::Disconnected),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
