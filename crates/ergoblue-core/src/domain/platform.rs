//! Host operating system families a destination can run.

use serde::{Deserialize, Serialize};

/// The operating system of a destination host.
///
/// The platform decides which variant of an international key is typed and
/// whether Unicode entry via `Ctrl+Shift+U` is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Stable lowercase name, matching the configuration file spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
