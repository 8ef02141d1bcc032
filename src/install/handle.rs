//! Shared record of one install attempt
//!
//! A handle is shared (`Arc`) between every caller that asked for the same
//! [`RequestKey`]. Its state only moves forward:
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | Pending | Running | leader starts the executor |
//! | Running | Done / Failed | executor returns |
//! | Pending | Failed(Cancelled) | leader gave up before running |
//!
//! Handles created from install history start in `Done`.

use crate::catalog::JdkItem;
use crate::error::InstallError;
use crate::install::RequestKey;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Lifecycle state of an install attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    Pending,
    Running,
    Done,
    Failed(InstallError),
}

impl InstallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed(_) => write!(f, "failed"),
        }
    }
}

/// One install attempt for one artifact
pub struct InstallHandle {
    id: Uuid,
    item: JdkItem,
    install_dir: PathBuf,
    java_home: PathBuf,
    state: watch::Sender<InstallState>,
}

impl InstallHandle {
    fn new(item: JdkItem, install_dir: PathBuf, state: InstallState) -> Arc<Self> {
        let java_home = item.java_home(&install_dir);
        let (state, _) = watch::channel(state);
        Arc::new(Self {
            id: Uuid::new_v4(),
            item,
            install_dir,
            java_home,
            state,
        })
    }

    pub(crate) fn pending(item: JdkItem, install_dir: PathBuf) -> Arc<Self> {
        Self::new(item, install_dir, InstallState::Pending)
    }

    pub(crate) fn done(item: JdkItem, install_dir: PathBuf) -> Arc<Self> {
        Self::new(item, install_dir, InstallState::Done)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &RequestKey {
        &self.item.key
    }

    pub fn item(&self) -> &JdkItem {
        &self.item
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn java_home(&self) -> &Path {
        &self.java_home
    }

    /// Snapshot of the current state
    pub fn state(&self) -> InstallState {
        self.state.borrow().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    /// Pending -> Running. Returns false if the handle already left Pending.
    pub(crate) fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == InstallState::Pending {
                *state = InstallState::Running;
                true
            } else {
                false
            }
        })
    }

    /// Move to a terminal state. Returns false if already terminal.
    pub(crate) fn finish(&self, outcome: Result<(), InstallError>) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = match outcome {
                Ok(()) => InstallState::Done,
                Err(e) => InstallState::Failed(e),
            };
            true
        })
    }

    /// Pending -> Failed(Cancelled), for a leader that never ran
    pub(crate) fn abandon(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == InstallState::Pending {
                *state = InstallState::Failed(InstallError::Cancelled);
                true
            } else {
                false
            }
        })
    }

    /// Wait for the terminal state and return the java home.
    ///
    /// Firing `cancel` abandons only this wait; the shared attempt and other
    /// waiters are unaffected. Only a watch receiver is held across the
    /// await, so dropping the future (e.g. under `tokio::time::timeout`) is
    /// equally harmless.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<PathBuf, InstallError> {
        let mut rx = self.state.subscribe();

        let terminal = tokio::select! {
            biased;
            state = rx.wait_for(InstallState::is_terminal) => match state {
                Ok(state) => state.clone(),
                Err(_) => InstallState::Failed(InstallError::Cancelled),
            },
            _ = cancel.cancelled() => return Err(InstallError::Cancelled),
        };

        match terminal {
            InstallState::Done => Ok(self.java_home.clone()),
            InstallState::Failed(e) => Err(e),
            InstallState::Pending | InstallState::Running => Err(InstallError::Cancelled),
        }
    }
}

impl fmt::Debug for InstallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallHandle")
            .field("id", &self.id)
            .field("key", self.key())
            .field("install_dir", &self.install_dir)
            .field("state", &self.state())
            .finish()
    }
}
