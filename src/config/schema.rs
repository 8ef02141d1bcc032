//! Configuration schema for jdkup
//!
//! Configuration is stored at `~/.config/jdkup/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Install location settings
    pub install: InstallConfig,

    /// Feed and download settings
    pub download: DownloadConfig,

    /// Install history settings
    pub history: HistoryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable the install event log
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Install location settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Directory new JDKs are installed under (default: ~/.jdks)
    pub root: Option<PathBuf>,
}

impl InstallConfig {
    /// Resolve the install root, falling back to `~/.jdks`
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".jdks")
        })
    }
}

/// Feed and download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// JDK feed location (path, file:// or http(s):// URL)
    pub feed_url: Option<String>,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Timeout for receiving a whole archive body in seconds
    pub read_timeout_secs: u64,
}

impl DownloadConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            connect_timeout_secs: 30,
            read_timeout_secs: 600,
        }
    }
}

/// Install history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// History file location (default: <state dir>/jdkup/history.json)
    pub path: Option<PathBuf>,

    /// Drop entries for deleted install dirs on every start
    pub prune_on_start: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            prune_on_start: true,
        }
    }
}
