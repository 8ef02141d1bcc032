//! jdkup - JDK installer
//!
//! Downloads, verifies and unpacks JDK builds from a JSON feed. Requests
//! for the same archive are deduplicated: concurrent callers share one
//! download, and completed installs are answered from history.

pub mod audit;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod install;
pub mod ui;

pub use error::{InstallError, JdkupError, JdkupResult};
