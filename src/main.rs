//! jdkup - JDK installer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use jdkup::cli::{Cli, Commands};
use jdkup::config::{Config, ConfigManager};
use jdkup::error::JdkupResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; JSON lines when `general.log_format = "json"`
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("jdkup=warn"),
        1 => EnvFilter::new("jdkup=info"),
        _ => EnvFilter::new("jdkup=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> JdkupResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    jdkup::ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    ConfigManager::ensure_state_dirs().await?;

    match cli.command {
        Commands::List(args) => jdkup::cli::commands::list(args, &config).await,
        Commands::Install(args) => jdkup::cli::commands::install(args, &config).await,
        Commands::History(args) => jdkup::cli::commands::history(args, &config).await,
        Commands::Config(args) => {
            jdkup::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
