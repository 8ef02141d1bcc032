//! Error types for jdkup
//!
//! All modules use `JdkupResult<T>` as their return type. Install attempts
//! report the narrower [`InstallError`], which is cloned to every caller
//! sharing the attempt.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jdkup operations
pub type JdkupResult<T> = Result<T, JdkupError>;

/// Failure of a single install attempt
///
/// `Clone` so that every waiter on a shared install receives the same value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("Invalid install target {path}: {reason}")]
    InvalidTargetPath { path: PathBuf, reason: String },

    #[error("Download failed for {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("Size mismatch for {url}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to unpack into {path}: {reason}")]
    ExtractionFailure { path: PathBuf, reason: String },

    #[error("Installation cancelled")]
    Cancelled,
}

impl InstallError {
    /// Create an invalid target error
    pub fn invalid_target(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidTargetPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a network failure
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an extraction failure
    pub fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExtractionFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// All errors that can occur in jdkup
#[derive(Error, Debug)]
pub enum JdkupError {
    // Install errors
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("Invalid request key: {0}")]
    InvalidKey(String),

    // Catalog errors
    #[error("No JDK feed configured")]
    FeedNotConfigured,

    #[error("Failed to fetch JDK feed {source_name}: {reason}")]
    FeedFetch { source_name: String, reason: String },

    #[error("Invalid JDK feed {source_name}: {reason}")]
    FeedInvalid { source_name: String, reason: String },

    #[error("No JDK matching '{query}' for {os}/{arch}")]
    JdkNotFound {
        query: String,
        os: String,
        arch: String,
    },

    // History errors
    #[error("Invalid install history at {path}: {reason}")]
    HistoryInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl JdkupError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Install(InstallError::NetworkFailure { .. } | InstallError::Cancelled)
                | Self::FeedFetch { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::FeedNotConfigured => {
                Some("Pass --feed <path|url> or run: jdkup config set download.feed_url <url>")
            }
            Self::JdkNotFound { .. } => Some("Run: jdkup list --all"),
            Self::Install(InstallError::InvalidTargetPath { .. }) => {
                Some("Choose an empty directory with --dir")
            }
            Self::Install(InstallError::ChecksumMismatch { .. } | InstallError::SizeMismatch { .. }) => {
                Some("The feed entry or the mirror is out of date; refresh the feed")
            }
            _ => None,
        }
    }
}
