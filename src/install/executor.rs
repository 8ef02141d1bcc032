//! Executor contract for the physical download and unpack

use crate::catalog::JdkItem;
use crate::error::InstallError;
use crate::install::RequestKey;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Performs one physical install of an artifact.
///
/// Implementations download `item.url()`, verify size and SHA-256 against
/// the item, and unpack so that `target` appears only once everything
/// succeeded. Partial state is removed on failure. `cancel` is checked at
/// safe points and turns into [`InstallError::Cancelled`].
#[async_trait]
pub trait InstallExecutor: Send + Sync {
    /// Install `item` into `target`, returning the install dir
    async fn execute(
        &self,
        item: &JdkItem,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError>;
}

/// Receives progress notifications from an executor
pub trait ProgressSink: Send + Sync {
    /// Download started; `total` is the expected size when known
    fn download_started(&self, key: &RequestKey, total: Option<u64>);

    /// `downloaded` bytes received so far
    fn download_progress(&self, key: &RequestKey, downloaded: u64);

    /// Archive verified, unpacking started
    fn unpacking(&self, key: &RequestKey);

    /// Executor is done with this key, successfully or not
    fn finished(&self, key: &RequestKey);
}
