//! A single downloadable JDK build from the feed

use crate::error::InstallError;
use crate::install::RequestKey;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Archive format of a JDK package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    #[serde(rename = "targz", alias = "tar.gz", alias = "tgz")]
    TarGz,
    #[serde(rename = "zip")]
    Zip,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => write!(f, "tar.gz"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

/// Feed entry describing one JDK archive for one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdkItem {
    /// Vendor name, e.g. "temurin"
    pub vendor: String,

    /// Product name when the vendor ships several, e.g. "graalvm-ce"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Archive identity: `sha256`, `jdk_version` (e.g. "17.0.2+8") and `url`
    #[serde(flatten)]
    pub key: RequestKey,

    /// Feature release, e.g. 17
    #[serde(rename = "jdk_version_major")]
    pub major: u32,

    /// Archive size in bytes when the feed knows it
    #[serde(default)]
    pub archive_size: Option<u64>,

    pub archive_file_name: String,
    pub package_type: PackageType,

    /// Top-level directory inside the archive that becomes the install dir
    #[serde(default)]
    pub package_root_prefix: String,

    /// Path from the install dir to the java home (e.g. "Contents/Home")
    #[serde(default, rename = "package_to_java_home_prefix")]
    pub java_home_prefix: String,

    #[serde(default)]
    pub unpacked_size: Option<u64>,

    /// Folder name used under the install root
    pub install_folder_name: String,

    pub os: String,
    pub arch: String,
}

impl JdkItem {
    pub fn version(&self) -> &str {
        self.key.version()
    }

    pub fn url(&self) -> &str {
        self.key.url()
    }

    /// Stable identifier used on the command line
    pub fn id(&self) -> String {
        format!("{}-{}", self.vendor, self.version()).to_lowercase()
    }

    /// Human-readable name
    pub fn display_name(&self) -> String {
        match self.product {
            Some(ref product) => format!("{} {} {}", self.vendor, product, self.version()),
            None => format!("{} {}", self.vendor, self.version()),
        }
    }

    /// Default install location under `root`. The folder name must be a
    /// single plain path component.
    pub fn default_install_dir(&self, root: &Path) -> Result<PathBuf, InstallError> {
        let folder = Path::new(&self.install_folder_name);
        let mut components = folder.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(root.join(folder)),
            _ => Err(InstallError::invalid_target(
                root.join(folder),
                format!("invalid install folder name '{}'", self.install_folder_name),
            )),
        }
    }

    /// Java home for an install of this item at `install_dir`
    pub fn java_home(&self, install_dir: &Path) -> PathBuf {
        let prefix = self.java_home_prefix.trim_matches('/');
        if prefix.is_empty() {
            install_dir.to_path_buf()
        } else {
            install_dir.join(prefix)
        }
    }

    /// Lenient semantic version: "17" -> 17.0.0, "17.0.2+8" keeps build metadata
    pub fn semver(&self) -> Option<Version> {
        parse_lenient(self.version())
    }

    /// Newest-first ordering; items with unparseable versions sort last
    pub fn newest_first(a: &JdkItem, b: &JdkItem) -> Ordering {
        match (a.semver(), b.semver()) {
            (Some(va), Some(vb)) => vb.cmp(&va),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.version().cmp(a.version()),
        }
        .then_with(|| b.major.cmp(&a.major))
        .then_with(|| a.vendor.cmp(&b.vendor))
    }
}

fn parse_lenient(version: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(version) {
        return Some(v);
    }

    let (core, build) = match version.split_once('+') {
        Some((core, build)) => (core, Some(build)),
        None => (version, None),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    let padded = match build {
        Some(build) => format!("{}+{}", parts.join("."), build),
        None => parts.join("."),
    };
    Version::parse(&padded).ok()
}
