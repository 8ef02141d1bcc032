//! JSON file backed install history

use super::{HistoryEntry, HistoryStore};
use crate::error::{JdkupError, JdkupResult};
use crate::install::RequestKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    entries: Vec<HistoryEntry>,
}

#[derive(Default)]
struct State {
    entries: Vec<HistoryEntry>,
    dirty: bool,
}

/// History kept in memory and persisted to one JSON file.
///
/// Lifecycle is explicit: [`FileHistoryStore::open`] reads the file,
/// mutations only touch memory, [`FileHistoryStore::flush`] writes it back.
pub struct FileHistoryStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl FileHistoryStore {
    /// Open the store, reading `path` if it exists
    pub async fn open(path: impl Into<PathBuf>) -> JdkupResult<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).await.map_err(|e| {
                JdkupError::io(format!("reading install history {}", path.display()), e)
            })?;
            let file: HistoryFile =
                serde_json::from_str(&content).map_err(|e| JdkupError::HistoryInvalid {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if file.version != FORMAT_VERSION {
                return Err(JdkupError::HistoryInvalid {
                    path,
                    reason: format!("unsupported format version {}", file.version),
                });
            }
            file.entries
        } else {
            debug!("No install history at {}, starting empty", path.display());
            Vec::new()
        };

        debug!("Loaded {} install history entries", entries.len());
        Ok(Self {
            path,
            state: Mutex::new(State {
                entries,
                dirty: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are changes not yet flushed
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Write pending changes to disk (temp file + rename)
    pub async fn flush(&self) -> JdkupResult<()> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| JdkupError::io("creating install history directory", e))?;
        }

        let file = HistoryFile {
            version: FORMAT_VERSION,
            entries: state.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| JdkupError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| JdkupError::io(format!("replacing {}", self.path.display()), e))?;

        state.dirty = false;
        debug!("Flushed {} install history entries", state.entries.len());
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn lookup(&self, key: &RequestKey) -> Option<PathBuf> {
        let mut state = self.state.lock().await;

        let before = state.entries.len();
        state
            .entries
            .retain(|e| &e.key != key || e.install_dir.is_dir());
        if state.entries.len() != before {
            debug!("Dropped {} stale history entries for {}", before - state.entries.len(), key);
            state.dirty = true;
        }

        state
            .entries
            .iter()
            .rev()
            .find(|e| &e.key == key)
            .map(|e| e.install_dir.clone())
    }

    async fn record(&self, key: &RequestKey, install_dir: &Path) -> JdkupResult<()> {
        let mut state = self.state.lock().await;
        if state.entries.iter().any(|e| e.matches(key, install_dir)) {
            return Ok(());
        }

        state
            .entries
            .push(HistoryEntry::new(key.clone(), install_dir.to_path_buf()));
        state.dirty = true;
        debug!("Recorded {} at {}", key, install_dir.display());
        Ok(())
    }

    async fn forget(&self, key: &RequestKey, install_dir: &Path) -> JdkupResult<()> {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|e| !e.matches(key, install_dir));
        if state.entries.len() != before {
            state.dirty = true;
            debug!("Forgot {} at {}", key, install_dir.display());
        }
        Ok(())
    }

    async fn prune(&self) -> JdkupResult<Vec<HistoryEntry>> {
        let mut state = self.state.lock().await;
        let (kept, pruned): (Vec<_>, Vec<_>) = state
            .entries
            .drain(..)
            .partition(|e| e.install_dir.is_dir());
        state.entries = kept;

        if !pruned.is_empty() {
            state.dirty = true;
            info!("Pruned {} stale install history entries", pruned.len());
        }
        Ok(pruned)
    }

    async fn entries(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.entries.clone()
    }
}
