//! hidraw enumerator: finds the keyboard halves among the host's HID devices.
//!
//! The kernel exposes every HID device as `/dev/hidrawN` and describes it
//! under `/sys/class/hidraw/hidrawN/device/uevent`.  The enumerator rescans
//! that directory on a fixed interval.  A node is attached once; when it
//! disappears (the half was unplugged or lost its Bluetooth link) it is
//! forgotten, so the same node name is picked up again on reconnect.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{classify_name, parse_hid_name, PhysicalSource, SourceError};

const SYS_CLASS_HIDRAW: &str = "/sys/class/hidraw";
const DEV_DIR: &str = "/dev";

/// Periodically scans hidraw nodes and opens the ones that are halves.
#[derive(Debug)]
pub struct HidrawEnumerator {
    sys_root: PathBuf,
    dev_root: PathBuf,
    prefix: String,
    interval: Duration,
    /// Nodes already turned into a source.
    attached: HashSet<String>,
    /// Nodes already reported as unrecognized, so the warning is logged once.
    rejected: HashSet<String>,
}

impl HidrawEnumerator {
    pub fn new(prefix: impl Into<String>, interval: Duration) -> Self {
        Self::with_roots(SYS_CLASS_HIDRAW, DEV_DIR, prefix, interval)
    }

    /// Enumerator reading descriptions under `sys_root` and opening nodes
    /// under `dev_root`.
    pub fn with_roots(
        sys_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
        prefix: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
            prefix: prefix.into(),
            interval,
            attached: HashSet::new(),
            rejected: HashSet::new(),
        }
    }

    /// Scans once and returns the outcome for every node not seen before.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the hidraw class directory cannot be
    /// listed.  Per-node failures are returned inside the vector.
    pub async fn scan(&mut self) -> Result<Vec<Result<PhysicalSource, SourceError>>, SourceError> {
        let present = list_nodes(&self.sys_root).await?;

        self.attached.retain(|node| present.contains(node));
        self.rejected.retain(|node| present.contains(node));

        let mut outcomes = Vec::new();
        let mut fresh: Vec<&String> = present
            .iter()
            .filter(|node| !self.attached.contains(*node) && !self.rejected.contains(*node))
            .collect();
        fresh.sort();

        for node in fresh {
            let outcome = self.open_node(node).await;
            match &outcome {
                Ok(_) => {
                    self.attached.insert(node.clone());
                }
                Err(SourceError::Unrecognized(_)) => {
                    self.rejected.insert(node.clone());
                }
                // Retried on the next scan; the node may still be settling.
                Err(SourceError::Io { .. }) => {}
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Scans every interval and hands new halves to `sources` until the
    /// receiver is dropped.
    pub async fn run(mut self, sources: mpsc::Sender<PhysicalSource>) {
        info!(dir = %self.sys_root.display(), "watching for keyboard halves");
        loop {
            match self.scan().await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            Ok(source) => {
                                info!(address = %source.address, "keyboard half attached");
                                if sources.send(source).await.is_err() {
                                    debug!("input pipeline gone; enumerator stopping");
                                    return;
                                }
                            }
                            Err(e @ SourceError::Unrecognized(_)) => warn!(error = %e, "skipping device"),
                            Err(e) => debug!(error = %e, "device not ready"),
                        }
                    }
                }
                Err(e) => debug!(error = %e, "hidraw scan failed"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn open_node(&self, node: &str) -> Result<PhysicalSource, SourceError> {
        let uevent_path = self.sys_root.join(node).join("device").join("uevent");
        let uevent = tokio::fs::read_to_string(&uevent_path)
            .await
            .map_err(|source| SourceError::Io {
                path: uevent_path.clone(),
                source,
            })?;
        let name = parse_hid_name(&uevent).unwrap_or_default();
        let address = classify_name(&self.prefix, name)?;

        let dev_path = self.dev_root.join(node);
        let file = tokio::fs::File::open(&dev_path)
            .await
            .map_err(|source| SourceError::Io {
                path: dev_path.clone(),
                source,
            })?;
        debug!(node, %address, "opened hidraw node");
        Ok(PhysicalSource::new(address, file))
    }
}

async fn list_nodes(sys_root: &Path) -> Result<HashSet<String>, SourceError> {
    let io_error = |source| SourceError::Io {
        path: sys_root.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(sys_root).await.map_err(io_error)?;
    let mut nodes = HashSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with("hidraw") {
                nodes.insert(name.to_string());
            }
        }
    }
    Ok(nodes)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
