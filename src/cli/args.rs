//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// jdkup - JDK installer
///
/// Downloads, verifies and unpacks JDK builds listed in a JSON feed.
/// Concurrent requests for the same archive share one download.
#[derive(Parser, Debug)]
#[command(name = "jdkup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "JDKUP_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List JDKs available in the feed
    List(ListArgs),

    /// Install one or more JDKs
    Install(InstallArgs),

    /// Show or prune the install history
    History(HistoryArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Feed location (path, file:// or http(s):// URL)
    #[arg(long)]
    pub feed: Option<String>,

    /// Show builds for every platform, not just this one
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// JDK ids (e.g. temurin-17.0.2) or major versions (e.g. 17)
    #[arg(required = true)]
    pub jdks: Vec<String>,

    /// Feed location (path, file:// or http(s):// URL)
    #[arg(long)]
    pub feed: Option<String>,

    /// Install directory; only valid with a single JDK
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Arguments for the history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List recorded installs
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Forget installs whose directory no longer exists
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., download.feed_url)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
