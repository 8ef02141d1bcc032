//! Content-addressed identity of a downloadable JDK archive

use crate::error::{JdkupError, JdkupResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one downloadable artifact.
///
/// Two requests with equal keys share a download regardless of where they
/// want the result installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRequestKey")]
pub struct RequestKey {
    sha256: String,
    version: String,
    url: String,
}

#[derive(Deserialize)]
struct RawRequestKey {
    sha256: String,
    #[serde(alias = "jdk_version")]
    version: String,
    url: String,
}

impl TryFrom<RawRequestKey> for RequestKey {
    type Error = JdkupError;

    fn try_from(raw: RawRequestKey) -> JdkupResult<Self> {
        Self::new(raw.sha256, raw.version, raw.url)
    }
}

impl RequestKey {
    /// Build a key, validating and lower-casing the SHA-256 digest
    pub fn new(
        sha256: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> JdkupResult<Self> {
        let sha256 = sha256.into().to_ascii_lowercase();
        if sha256.len() != 64 || !sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(JdkupError::InvalidKey(format!(
                "sha256 must be 64 hex characters, got '{}'",
                sha256
            )));
        }

        let url = url.into();
        if url.trim().is_empty() {
            return Err(JdkupError::InvalidKey("url is empty".to_string()));
        }

        Ok(Self {
            sha256,
            version: version.into(),
            url,
        })
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// First 12 hex characters of the digest
    pub fn short_hash(&self) -> &str {
        &self.sha256[..12]
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.version, self.short_hash())
    }
}
