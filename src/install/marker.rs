//! Install marker file
//!
//! Every completed install directory carries `.jdkup.json` naming the
//! archive it was unpacked from. A directory "matches" a key only when the
//! marker is present and names that key.

use crate::catalog::JdkItem;
use crate::install::RequestKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Marker file name inside an install directory
pub const MARKER_FILE: &str = ".jdkup.json";

/// Contents of the marker file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallMarker {
    #[serde(flatten)]
    pub key: RequestKey,
    pub vendor: String,
    pub installed_at: DateTime<Utc>,
}

impl InstallMarker {
    pub fn for_item(key: RequestKey, item: &JdkItem) -> Self {
        Self {
            key,
            vendor: item.vendor.clone(),
            installed_at: Utc::now(),
        }
    }
}

pub fn marker_path(install_dir: &Path) -> PathBuf {
    install_dir.join(MARKER_FILE)
}

/// Read the marker of an install directory, `None` when absent or unreadable
pub fn read_marker(install_dir: &Path) -> Option<InstallMarker> {
    let content = fs::read_to_string(marker_path(install_dir)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write the marker atomically (temp file + rename)
pub fn write_marker(install_dir: &Path, marker: &InstallMarker) -> io::Result<()> {
    let content = serde_json::to_vec_pretty(marker).map_err(io::Error::other)?;
    let tmp = install_dir.join(format!("{}.tmp", MARKER_FILE));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, marker_path(install_dir))
}

/// Whether `install_dir` exists and holds an install of `key`
pub fn matches_key(install_dir: &Path, key: &RequestKey) -> bool {
    install_dir.is_dir() && read_marker(install_dir).is_some_and(|m| &m.key == key)
}
