//! InputPipeline: funnels raw scans from both keyboard halves into one queue.
//!
//! Every attached half gets its own reader task.  The tasks never touch
//! session state; they only tag each 8-byte scan with the half it came from
//! and push it into the single channel the keymap engine drains, so edges
//! from the two halves can never interleave inside one dispatch.
//!
//! ```text
//! left half  ──read_exact(8)──► KeyMatrixEvent(Left)  ─┐
//!                                                      ├──► mpsc ──► KeymapEngine
//! right half ──read_exact(8)──► KeyMatrixEvent(Right) ─┘
//! ```

use std::fmt;

use ergoblue_core::{KeyMatrixEvent, Side, RAW_REPORT_LEN};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One keyboard half: its address and the stream of raw scans it produces.
pub struct PhysicalSource {
    pub address: String,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl PhysicalSource {
    pub fn new(
        address: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            address: address.into(),
            reader: Box::new(reader),
        }
    }
}

impl fmt::Debug for PhysicalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalSource")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Attaches keyboard halves and forwards their scans to the engine.
#[derive(Debug, Clone)]
pub struct InputPipeline {
    left_half: String,
    right_half: String,
    events: mpsc::Sender<KeyMatrixEvent>,
}

impl InputPipeline {
    pub fn new(
        left_half: impl Into<String>,
        right_half: impl Into<String>,
        events: mpsc::Sender<KeyMatrixEvent>,
    ) -> Self {
        Self {
            left_half: left_half.into(),
            right_half: right_half.into(),
            events,
        }
    }

    /// The left half is the one with the configured left address; anything
    /// else is read as the right half.
    pub fn side_for(&self, address: &str) -> Side {
        if address == self.left_half {
            return Side::Left;
        }
        if address != self.right_half {
            warn!(%address, "unknown half address; treating it as the right half");
        }
        Side::Right
    }

    /// Spawns the reader task for `source`.
    ///
    /// The task ends at the first read error (including end of stream) or
    /// once the engine's queue is closed.
    pub fn attach(&self, source: PhysicalSource) -> JoinHandle<()> {
        let side = self.side_for(&source.address);
        info!(address = %source.address, ?side, "reading keyboard half");
        tokio::spawn(read_scans(source, side, self.events.clone()))
    }

    /// Attaches every source received until the sender side is dropped.
    pub async fn run(self, mut sources: mpsc::Receiver<PhysicalSource>) {
        while let Some(source) = sources.recv().await {
            self.attach(source);
        }
        debug!("source channel closed; no more halves will be attached");
    }
}

async fn read_scans(
    mut source: PhysicalSource,
    side: Side,
    events: mpsc::Sender<KeyMatrixEvent>,
) {
    let mut raw = [0u8; RAW_REPORT_LEN];
    loop {
        if let Err(e) = source.reader.read_exact(&mut raw).await {
            info!(address = %source.address, error = %e, "keyboard half disconnected");
            return;
        }
        if events.send(KeyMatrixEvent::new(raw, side)).await.is_err() {
            debug!(address = %source.address, "engine queue closed; reader stopping");
            return;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_source::mock::MockHalf;

    const LEFT: &str = "000000000000";
    const RIGHT: &str = "111111111111";

    fn pipeline() -> (InputPipeline, mpsc::Receiver<KeyMatrixEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (InputPipeline::new(LEFT, RIGHT, tx), rx)
    }

    #[test]
    fn test_side_for_matches_configured_addresses() {
        let (tx, _rx) = mpsc::channel(1);
        let pipeline = InputPipeline::new(LEFT, RIGHT, tx);

        assert_eq!(pipeline.side_for(LEFT), Side::Left);
        assert_eq!(pipeline.side_for(RIGHT), Side::Right);
        assert_eq!(pipeline.side_for("222222222222"), Side::Right);
    }

    #[tokio::test]
    async fn test_attached_half_forwards_scans_tagged_with_its_side() {
        // Arrange
        let (pipeline, mut rx) = pipeline();
        let (mut half, source) = MockHalf::connect(LEFT);
        pipeline.attach(source);

        // Act
        half.send_scan([0x01, 0x80, 0, 0, 0, 0, 0, 0]).await.expect("send");

        // Assert
        let event = rx.recv().await.expect("event");
        assert_eq!(event.side, Side::Left);
        assert_eq!(event.raw, [0x01, 0x80, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_scans_from_both_halves_share_one_queue() {
        // Arrange
        let (pipeline, mut rx) = pipeline();
        let (mut left, left_source) = MockHalf::connect(LEFT);
        let (mut right, right_source) = MockHalf::connect(RIGHT);
        pipeline.attach(left_source);
        pipeline.attach(right_source);

        // Act
        left.send_scan([1; RAW_REPORT_LEN]).await.expect("send");
        let first = rx.recv().await.expect("event");
        right.send_scan([2; RAW_REPORT_LEN]).await.expect("send");
        let second = rx.recv().await.expect("event");

        // Assert
        assert_eq!((first.side, first.raw[0]), (Side::Left, 1));
        assert_eq!((second.side, second.raw[0]), (Side::Right, 2));
    }

    #[tokio::test]
    async fn test_partial_report_then_disconnect_ends_reader_without_event() {
        // Arrange
        let (pipeline, mut rx) = pipeline();
        let (mut half, source) = MockHalf::connect(RIGHT);
        let task = pipeline.attach(source);

        // Act
        half.send_bytes(&[0x01, 0x02, 0x03]).await.expect("send");
        half.unplug();
        task.await.expect("reader task");

        // Assert
        drop(pipeline);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_stops_when_engine_queue_closes() {
        // Arrange
        let (pipeline, rx) = pipeline();
        let (mut half, source) = MockHalf::connect(LEFT);
        let task = pipeline.attach(source);
        drop(rx);

        // Act
        half.send_scan([0; RAW_REPORT_LEN]).await.expect("send");

        // Assert
        task.await.expect("reader task");
    }

    #[tokio::test]
    async fn test_run_attaches_every_received_source() {
        // Arrange
        let (pipeline, mut rx) = pipeline();
        let (sources_tx, sources_rx) = mpsc::channel(4);
        let runner = tokio::spawn(pipeline.run(sources_rx));
        let (mut half, source) = MockHalf::connect(RIGHT);

        // Act
        sources_tx.send(source).await.expect("send source");
        half.send_scan([7; RAW_REPORT_LEN]).await.expect("send");
        let event = rx.recv().await.expect("event");
        drop(sources_tx);

        // Assert
        assert_eq!(event.side, Side::Right);
        runner.await.expect("pipeline run");
    }
}
