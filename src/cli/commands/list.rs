//! List command - show JDK builds in the feed

use super::{load_catalog, open_history};
use crate::catalog::{JdkItem, Platform};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::JdkupResult;
use crate::history::{HistoryEntry, HistoryStore};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ListEntry<'a> {
    id: String,
    vendor: &'a str,
    version: &'a str,
    major: u32,
    os: &'a str,
    arch: &'a str,
    url: &'a str,
    sha256: &'a str,
    installed_at: Option<&'a Path>,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> JdkupResult<()> {
    let ctx = UiContext::detect();
    let table = args.format == OutputFormat::Table;

    let catalog = load_catalog(args.feed.as_deref(), config, &ctx, table).await?;
    let platform = Platform::current();
    let items: Vec<&JdkItem> = if args.all {
        catalog.items().iter().collect()
    } else {
        catalog.for_platform(&platform).collect()
    };

    let history = open_history(config).await?.entries().await;
    let entries: Vec<ListEntry> = items
        .iter()
        .map(|&item| ListEntry {
            id: item.id(),
            vendor: &item.vendor,
            version: item.version(),
            major: item.major,
            os: &item.os,
            arch: &item.arch,
            url: item.url(),
            sha256: item.key.sha256(),
            installed_at: installed_dir(&history, item),
        })
        .collect();

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(
                &ctx,
                &format!("No JDK builds for {}-{}", platform.os, platform.arch),
            ),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&ctx, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.id);
            }
        }
    }

    Ok(())
}

/// Latest recorded install of `item` that still exists
fn installed_dir<'a>(history: &'a [HistoryEntry], item: &JdkItem) -> Option<&'a Path> {
    history
        .iter()
        .rev()
        .find(|e| e.key == item.key && e.install_dir.is_dir())
        .map(|e| e.install_dir.as_path())
}

fn print_table(ctx: &UiContext, entries: &[ListEntry]) {
    ui::intro(ctx, "Available JDKs");

    println!(
        "{:<28} {:<14} {:<8} {:<16} {}",
        style("ID").bold(),
        style("VERSION").bold(),
        style("MAJOR").bold(),
        style("PLATFORM").bold(),
        style("INSTALLED").bold()
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        let installed = match entry.installed_at {
            Some(dir) => style(dir.display().to_string()).green(),
            None => style("-".to_string()).dim(),
        };
        println!(
            "{:<28} {:<14} {:<8} {:<16} {}",
            entry.id,
            entry.version,
            entry.major,
            format!("{}-{}", entry.os, entry.arch),
            installed
        );
    }

    println!();
    println!("{} build(s)", entries.len());
}
