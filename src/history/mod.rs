//! Install history
//!
//! Remembers where each artifact was installed so later requests for the
//! same [`RequestKey`] are answered without downloading. Entries whose
//! directory disappeared are dropped lazily on lookup, or eagerly by
//! [`HistoryStore::prune`].

mod file;

pub use file::FileHistoryStore;

use crate::error::JdkupResult;
use crate::install::RequestKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One completed install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub key: RequestKey,
    pub install_dir: PathBuf,
    pub installed_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(key: RequestKey, install_dir: PathBuf) -> Self {
        Self {
            key,
            install_dir,
            installed_at: Utc::now(),
        }
    }

    pub fn matches(&self, key: &RequestKey, install_dir: &Path) -> bool {
        &self.key == key && self.install_dir == install_dir
    }
}

/// Durable record of completed installs
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recent existing install dir for `key`; drops entries whose dir is gone
    async fn lookup(&self, key: &RequestKey) -> Option<PathBuf>;

    /// Remember a completed install. Recording the same pair twice is a no-op.
    async fn record(&self, key: &RequestKey, install_dir: &Path) -> JdkupResult<()>;

    /// Drop the entry for `(key, install_dir)` if present
    async fn forget(&self, key: &RequestKey, install_dir: &Path) -> JdkupResult<()>;

    /// Drop every entry whose dir no longer exists, returning the dropped entries
    async fn prune(&self) -> JdkupResult<Vec<HistoryEntry>>;

    /// Snapshot of all entries, oldest first
    async fn entries(&self) -> Vec<HistoryEntry>;
}
