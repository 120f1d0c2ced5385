//! Recording report sink for unit and integration tests.
//!
//! Captures every report written to it so tests can assert on the exact
//! bytes a destination received, without a gadget device or a Bluetooth
//! connection.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ergoblue_core::{decode_report, HidReport};

use crate::application::device_registry::{ReportSink, SinkError};

/// A [`ReportSink`] that records every write.
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<Vec<u8>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records each attempt but reports it as undeliverable.
    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every report written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and clears the recorded writes.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.writes.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Recorded writes decoded back into reports; undecodable writes are
    /// skipped.
    pub fn reports(&self) -> Vec<HidReport> {
        self.writes()
            .iter()
            .filter_map(|bytes| decode_report(bytes).ok())
            .collect()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn write(&self, report: &[u8]) -> Result<usize, SinkError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.to_vec());
        if self.fail {
            return Err(SinkError::Disconnected);
        }
        Ok(report.len())
    }
}
