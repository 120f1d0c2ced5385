//! Report sink for the USB gadget port (`/dev/hidg0`).
//!
//! The gadget device file blocks a writer until the USB host polls for the
//! next report.  With no host attached that would be forever, so the file is
//! opened non-blocking and every write waits for writability through tokio's
//! [`AsyncFd`] for at most the configured deadline.
//!
//! The gadget itself (configfs functions, the report descriptor) is set up by
//! an external script before the controller starts.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;

use crate::application::device_registry::{ReportSink, SinkError};

/// Sink writing raw reports to a HID gadget device file.
pub struct GadgetSink {
    file: AsyncFd<File>,
    deadline: Duration,
}

impl GadgetSink {
    /// Opens the gadget device write-only and non-blocking.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or registered with
    /// the tokio reactor.
    pub fn open(path: &Path, deadline: Duration) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self {
            file: AsyncFd::new(file)?,
            deadline,
        })
    }

    async fn write_when_ready(&self, report: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.file.writable().await?;
            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.write(report)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

#[async_trait]
impl ReportSink for GadgetSink {
    async fn write(&self, report: &[u8]) -> Result<usize, SinkError> {
        match tokio::time::timeout(self.deadline, self.write_when_ready(report)).await {
            Ok(result) => Ok(result?),
            Err(_elapsed) => Err(SinkError::DeadlineExceeded(self.deadline)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
