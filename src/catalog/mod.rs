//! JDK catalog feed
//!
//! The feed is a JSON document `{"jdks": [...]}` listing one entry per
//! downloadable archive and platform. It is read from a local path, a
//! `file://` URL or an `http(s)://` URL.

pub(crate) mod item;

pub use item::{JdkItem, PackageType};

use crate::config::schema::DownloadConfig;
use crate::error::{JdkupError, JdkupResult};
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

/// Operating system and CPU architecture pair used to filter the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// The platform this binary runs on
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: normalize_os(os).to_string(),
            arch: normalize_arch(arch).to_string(),
        }
    }

    /// Whether a feed entry targets this platform
    pub fn matches(&self, item: &JdkItem) -> bool {
        normalize_os(&item.os) == self.os && normalize_arch(&item.arch) == self.arch
    }
}

fn normalize_os(os: &str) -> &str {
    match os {
        "darwin" | "macosx" | "mac" => "macos",
        "win" => "windows",
        other => other,
    }
}

fn normalize_arch(arch: &str) -> &str {
    match arch {
        "amd64" | "x64" => "x86_64",
        "arm64" => "aarch64",
        other => other,
    }
}

#[derive(Deserialize)]
struct Feed {
    jdks: Vec<JdkItem>,
}

/// Parsed JDK feed
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<JdkItem>,
}

impl Catalog {
    /// Build a catalog from already-parsed items
    pub fn from_items(mut items: Vec<JdkItem>) -> Self {
        items.sort_by(JdkItem::newest_first);
        Self { items }
    }

    /// Parse a feed document
    pub fn parse(source_name: &str, content: &str) -> JdkupResult<Self> {
        let feed: Feed = serde_json::from_str(content).map_err(|e| JdkupError::FeedInvalid {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Parsed {} feed entries from {}", feed.jdks.len(), source_name);
        Ok(Self::from_items(feed.jdks))
    }

    /// Load a feed from a path or URL
    pub async fn load(source: &str, download: &DownloadConfig) -> JdkupResult<Self> {
        let source_owned = source.to_string();
        let connect_timeout = download.connect_timeout();
        let read_timeout = download.read_timeout();

        let content = tokio::task::spawn_blocking(move || {
            fetch_feed(&source_owned, connect_timeout, read_timeout)
        })
        .await
        .map_err(|e| JdkupError::Internal(format!("feed task failed: {}", e)))??;

        Self::parse(source, &content)
    }

    /// All entries, newest first
    pub fn items(&self) -> &[JdkItem] {
        &self.items
    }

    /// Entries for one platform, newest first
    pub fn for_platform<'a>(&'a self, platform: &Platform) -> impl Iterator<Item = &'a JdkItem> + 'a {
        let platform = platform.clone();
        self.items.iter().filter(move |item| platform.matches(item))
    }

    /// Find an entry by exact id or by bare major version (newest wins)
    pub fn find(&self, query: &str, platform: &Platform) -> JdkupResult<&JdkItem> {
        let wanted = query.trim().to_lowercase();
        let by_major: Option<u32> = wanted.parse().ok();

        self.for_platform(platform)
            .find(|item| match by_major {
                Some(major) => item.major == major,
                None => item.id() == wanted,
            })
            .ok_or_else(|| JdkupError::JdkNotFound {
                query: query.to_string(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            })
    }
}

fn fetch_feed(
    source: &str,
    connect_timeout: std::time::Duration,
    read_timeout: std::time::Duration,
) -> JdkupResult<String> {
    let fetch_err = |reason: String| JdkupError::FeedFetch {
        source_name: source.to_string(),
        reason,
    };

    if source.starts_with("http://") || source.starts_with("https://") {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(connect_timeout))
            .timeout_recv_body(Some(read_timeout))
            .build()
            .into();

        let mut response = agent.get(source).call().map_err(|e| fetch_err(e.to_string()))?;
        let mut content = String::new();
        response
            .body_mut()
            .as_reader()
            .read_to_string(&mut content)
            .map_err(|e| fetch_err(e.to_string()))?;
        return Ok(content);
    }

    let path = source.strip_prefix("file://").unwrap_or(source);
    std::fs::read_to_string(path).map_err(|e| fetch_err(e.to_string()))
}
