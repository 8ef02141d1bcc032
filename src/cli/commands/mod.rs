//! CLI command implementations

pub mod config;
pub mod history;
pub mod install;
pub mod list;

pub use config::execute as config;
pub use history::execute as history;
pub use install::execute as install;
pub use list::execute as list;

use crate::catalog::Catalog;
use crate::config::{Config, ConfigManager};
use crate::error::{JdkupError, JdkupResult};
use crate::history::FileHistoryStore;
use crate::ui::{TaskSpinner, UiContext};

/// Load the catalog from `--feed` or `download.feed_url`.
///
/// The spinner is skipped for machine-readable output.
async fn load_catalog(
    feed: Option<&str>,
    config: &Config,
    ctx: &UiContext,
    show_progress: bool,
) -> JdkupResult<Catalog> {
    let source = feed
        .map(str::to_string)
        .or_else(|| config.download.feed_url.clone())
        .ok_or(JdkupError::FeedNotConfigured)?;

    if !show_progress {
        return Catalog::load(&source, &config.download).await;
    }

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Loading catalog from {}...", source));
    match Catalog::load(&source, &config.download).await {
        Ok(catalog) => {
            spinner.stop(&format!("{} JDK builds in catalog", catalog.items().len()));
            Ok(catalog)
        }
        Err(e) => {
            spinner.stop_error("Failed to load catalog");
            Err(e)
        }
    }
}

async fn open_history(config: &Config) -> JdkupResult<FileHistoryStore> {
    FileHistoryStore::open(ConfigManager::history_path(config)).await
}
