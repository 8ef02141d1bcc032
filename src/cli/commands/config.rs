//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{JdkupError, JdkupResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "install.root",
    "download.feed_url",
    "download.connect_timeout_secs",
    "download.read_timeout_secs",
    "history.path",
    "history.prune_on_start",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> JdkupResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => println!("{}", toml::to_string_pretty(config)?),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let ctx = UiContext::detect();
            let mut updated = config.clone();
            if let Err(e) = apply(&mut updated, &key, &value) {
                ui::step_error_detail(&ctx, "Cannot set config value", &e.to_string());
                ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
                return Err(e);
            }
            manager.save(&updated).await?;
            ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> JdkupResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Set a dot-separated key on `config`
fn apply(config: &mut Config, key: &str, value: &str) -> JdkupResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            if !matches!(value, "text" | "json") {
                return Err(JdkupError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )));
            }
            config.general.log_format = value.to_string();
        }
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,
        ["install", "root"] => config.install.root = optional_path(value),
        ["download", "feed_url"] => {
            config.download.feed_url = (!value.is_empty()).then(|| value.to_string())
        }
        ["download", "connect_timeout_secs"] => {
            config.download.connect_timeout_secs = parse_secs(value)?
        }
        ["download", "read_timeout_secs"] => config.download.read_timeout_secs = parse_secs(value)?,
        ["history", "path"] => config.history.path = optional_path(value),
        ["history", "prune_on_start"] => config.history.prune_on_start = parse_bool(value)?,
        _ => return Err(JdkupError::User(format!("Unknown config key: {}", key))),
    }
    Ok(())
}

/// Empty string resets the key to its default
fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn parse_bool(value: &str) -> JdkupResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(JdkupError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_secs(value: &str) -> JdkupResult<u64> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(JdkupError::User(format!(
            "Invalid timeout: {}. Use a positive number of seconds",
            value
        ))),
    }
}
