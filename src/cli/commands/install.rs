//! Install command - download and unpack JDKs

use super::{load_catalog, open_history};
use crate::audit::AuditLog;
use crate::catalog::{JdkItem, Platform};
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::{InstallError, JdkupError, JdkupResult};
use crate::history::HistoryStore;
use crate::install::{ArchiveInstaller, InstallCoordinator, InstallExecutor};
use crate::ui::{self, DownloadProgress, UiContext};
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> JdkupResult<()> {
    let ctx = UiContext::detect();

    if args.dir.is_some() && args.jdks.len() > 1 {
        return Err(JdkupError::User(
            "--dir can only be used when installing a single JDK".to_string(),
        ));
    }

    let catalog = load_catalog(args.feed.as_deref(), config, &ctx, true).await?;
    let platform = Platform::current();
    let items = args
        .jdks
        .iter()
        .map(|query| catalog.find(query, &platform).cloned())
        .collect::<JdkupResult<Vec<JdkItem>>>()?;

    let history = Arc::new(open_history(config).await?);
    if config.history.prune_on_start {
        let pruned = history.prune().await?;
        debug!("Pruned {} stale history entries on start", pruned.len());
    }

    let coordinator = InstallCoordinator::new(history.clone());
    let installer = ArchiveInstaller::new(&config.download)
        .with_progress(Arc::new(DownloadProgress::new(&ctx)));
    let audit = AuditLog::new(config);
    let root = config.install.root_dir();
    let cancel = CancellationToken::new();

    ui::intro(&ctx, "Installing JDKs");

    let installs = items
        .iter()
        .map(|item| install_one(&coordinator, &installer, item, args.dir.clone(), &root, &cancel));
    let results = join_all(installs).await;

    let mut first_error: Option<InstallError> = None;
    let mut failed = 0;
    for (item, result) in items.iter().zip(results) {
        match result {
            Ok(java_home) => {
                ui::step_ok_detail(&ctx, &item.display_name(), &java_home.display().to_string());
                audit
                    .log(
                        "install.completed",
                        &serde_json::json!({
                            "id": item.id(),
                            "key": item.key.to_string(),
                            "java_home": java_home,
                        }),
                    )
                    .await;
            }
            Err(e) => {
                failed += 1;
                ui::step_error_detail(&ctx, &item.display_name(), &e.to_string());
                audit
                    .log(
                        "install.failed",
                        &serde_json::json!({
                            "id": item.id(),
                            "key": item.key.to_string(),
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                first_error.get_or_insert(e);
            }
        }
    }

    history.flush().await?;

    match first_error {
        None => {
            ui::outro_success(&ctx, &format!("{} JDK(s) ready", items.len()));
            Ok(())
        }
        Some(e) => {
            ui::outro_error(&ctx, &format!("{} of {} install(s) failed", failed, items.len()));
            Err(e.into())
        }
    }
}

/// Acquire and drive one request, returning its java home
async fn install_one(
    coordinator: &InstallCoordinator,
    executor: &dyn InstallExecutor,
    item: &JdkItem,
    dir: Option<PathBuf>,
    root: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf, InstallError> {
    let target = match dir {
        Some(dir) => dir,
        None => item.default_install_dir(root)?,
    };
    let ticket = coordinator.acquire(item, &target).await?;
    debug!("{} at {} as {:?}", item.key, target.display(), ticket.role());
    coordinator.run(&ticket, executor, cancel).await?;
    Ok(ticket.handle().java_home().to_path_buf())
}
