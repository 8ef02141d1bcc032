//! History command - show or prune recorded installs

use super::open_history;
use crate::audit::AuditLog;
use crate::cli::args::{HistoryAction, HistoryArgs, OutputFormat};
use crate::config::Config;
use crate::error::JdkupResult;
use crate::history::{HistoryEntry, HistoryStore};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the history command
pub async fn execute(args: HistoryArgs, config: &Config) -> JdkupResult<()> {
    match args.action {
        HistoryAction::List { format } => list(config, format).await,
        HistoryAction::Prune { yes } => prune(config, yes).await,
    }
}

async fn list(config: &Config, format: OutputFormat) -> JdkupResult<()> {
    let ctx = UiContext::detect();
    let entries = open_history(config).await?.entries().await;

    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&ctx, "No installs recorded"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&ctx, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.install_dir.display());
            }
        }
    }
    Ok(())
}

fn print_table(ctx: &UiContext, entries: &[HistoryEntry]) {
    ui::intro(ctx, "Install history");

    println!(
        "{:<28} {:<18} {}",
        style("JDK").bold(),
        style("INSTALLED").bold(),
        style("DIRECTORY").bold()
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        let dir = if entry.install_dir.is_dir() {
            style(entry.install_dir.display().to_string())
        } else {
            style(format!("{} (missing)", entry.install_dir.display())).yellow()
        };
        println!(
            "{:<28} {:<18} {}",
            entry.key,
            entry.installed_at.format("%Y-%m-%d %H:%M"),
            dir
        );
    }

    println!();
    println!("{} install(s)", entries.len());
}

async fn prune(config: &Config, yes: bool) -> JdkupResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let history = open_history(config).await?;

    let stale: Vec<HistoryEntry> = history
        .entries()
        .await
        .into_iter()
        .filter(|e| !e.install_dir.is_dir())
        .collect();

    if stale.is_empty() {
        ui::step_info(&ctx, "No stale history entries");
        return Ok(());
    }

    for entry in &stale {
        ui::step_warn(
            &ctx,
            &format!("{} ({} is gone)", entry.key, entry.install_dir.display()),
        );
    }

    let prompt = format!("Forget {} stale entr(ies)?", stale.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::remark(&ctx, "Nothing pruned; pass --yes to prune non-interactively");
        return Ok(());
    }

    let pruned = history.prune().await?;
    history.flush().await?;

    AuditLog::new(config)
        .log(
            "history.pruned",
            &serde_json::json!({
                "count": pruned.len(),
                "dirs": pruned.iter().map(|e| &e.install_dir).collect::<Vec<_>>(),
            }),
        )
        .await;
    ui::step_ok(&ctx, &format!("Pruned {} history entr(ies)", pruned.len()));
    Ok(())
}
