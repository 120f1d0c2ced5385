//! In-memory keyboard halves for tests.
//!
//! A [`MockHalf`] is the write end of a pipe whose read end is handed to the
//! pipeline as a [`PhysicalSource`], so tests can feed raw scans without a
//! hidraw device.

use ergoblue_core::RAW_REPORT_LEN;
use tokio::io::{AsyncWriteExt, DuplexStream};

use super::PhysicalSource;

/// Room for a burst of scans before the writer has to wait for the reader.
const PIPE_CAPACITY: usize = RAW_REPORT_LEN * 64;

/// Write end of a simulated keyboard half.
pub struct MockHalf {
    stream: DuplexStream,
}

impl MockHalf {
    /// Creates a half with `address` and the source the pipeline will read.
    pub fn connect(address: &str) -> (Self, PhysicalSource) {
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        (Self { stream: writer }, PhysicalSource::new(address, reader))
    }

    /// Sends one raw scan.
    pub async fn send_scan(&mut self, raw: [u8; RAW_REPORT_LEN]) -> std::io::Result<()> {
        self.stream.write_all(&raw).await
    }

    /// Sends raw bytes, for partial or malformed reports.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await
    }

    /// Simulates the half disconnecting.
    pub fn unplug(self) {
        drop(self.stream);
    }
}
