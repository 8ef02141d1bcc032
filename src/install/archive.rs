//! Archive installer: download, verify and unpack a JDK archive
//!
//! Work happens in a private temporary sibling of the target directory:
//!
//! ```text
//! <parent>/.<folder>-<short hash>-XXXXXX/   staging, removed on every exit
//!     <archive file>                       downloaded + verified
//!     unpacked/<package root prefix>/      renamed to <parent>/<folder>
//! ```
//!
//! The target only appears once download, verification and unpacking all
//! succeeded.

use crate::catalog::{JdkItem, PackageType};
use crate::config::schema::DownloadConfig;
use crate::error::InstallError;
use crate::install::executor::{InstallExecutor, ProgressSink};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tar::Archive;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zip::ZipArchive;

const CHUNK_SIZE: usize = 64 * 1024;

/// Production [`InstallExecutor`] for `tar.gz` and `zip` JDK archives.
///
/// `http(s)://` URLs are fetched with `ureq`; `file://` URLs are read from
/// disk, which serves local mirrors.
pub struct ArchiveInstaller {
    agent: ureq::Agent,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl ArchiveInstaller {
    pub fn new(download: &DownloadConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(download.connect_timeout()))
            .timeout_recv_body(Some(download.read_timeout()))
            .build()
            .into();

        Self {
            agent,
            progress: None,
        }
    }

    /// Report download and unpack progress to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

#[async_trait]
impl InstallExecutor for ArchiveInstaller {
    async fn execute(
        &self,
        item: &JdkItem,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError> {
        let job = InstallJob {
            agent: self.agent.clone(),
            progress: self.progress.clone(),
            item: item.clone(),
            target: target.to_path_buf(),
            cancel: cancel.clone(),
        };

        let result = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| InstallError::extraction(target, format!("install task failed: {}", e)))?;

        if let Some(ref progress) = self.progress {
            progress.finished(&item.key);
        }
        result
    }
}

/// Everything one blocking install needs, owned so it can move to a worker thread
struct InstallJob {
    agent: ureq::Agent,
    progress: Option<Arc<dyn ProgressSink>>,
    item: JdkItem,
    target: PathBuf,
    cancel: CancellationToken,
}

impl InstallJob {
    fn run(self) -> Result<PathBuf, InstallError> {
        let key = &self.item.key;
        let parent = match self.target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&parent).map_err(|e| {
            InstallError::invalid_target(&self.target, format!("creating parent: {}", e))
        })?;

        let folder = self
            .target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jdk".to_string());
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-{}-", folder, key.short_hash()))
            .tempdir_in(&parent)
            .map_err(|e| {
                InstallError::invalid_target(&self.target, format!("creating staging dir: {}", e))
            })?;
        debug!("Staging {} in {}", key, staging.path().display());

        let archive_name = Path::new(&self.item.archive_file_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("archive"));
        let archive_path = staging.path().join(archive_name);

        self.download(&archive_path)?;
        self.check_cancelled()?;

        if let Some(ref progress) = self.progress {
            progress.unpacking(key);
        }

        let unpacked = staging.path().join("unpacked");
        fs::create_dir(&unpacked).map_err(|e| InstallError::extraction(&unpacked, e))?;
        match self.item.package_type {
            PackageType::TarGz => unpack_tar_gz(&archive_path, &unpacked, &self.cancel)?,
            PackageType::Zip => unpack_zip(&archive_path, &unpacked, &self.cancel)?,
        }
        if let Err(e) = fs::remove_file(&archive_path) {
            debug!("Could not remove {}: {}", archive_path.display(), e);
        }

        let root = resolve_root(&unpacked, &self.item.package_root_prefix)?;
        self.check_cancelled()?;
        self.move_into_place(&root)?;

        info!("Installed {} into {}", key, self.target.display());
        Ok(self.target.clone())
    }

    fn check_cancelled(&self) -> Result<(), InstallError> {
        if self.cancel.is_cancelled() {
            Err(InstallError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn open(&self) -> Result<(Box<dyn Read>, Option<u64>), InstallError> {
        let url = self.item.url();

        if let Some(path) = url.strip_prefix("file://") {
            let file = File::open(path).map_err(|e| InstallError::network(url, e))?;
            let len = file.metadata().ok().map(|m| m.len());
            return Ok((Box::new(file), len));
        }

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| InstallError::network(url, e))?;
        let len = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        Ok((Box::new(response.into_body().into_reader()), len))
    }

    /// Stream the archive to `dest`, hashing as it goes, then verify it
    fn download(&self, dest: &Path) -> Result<(), InstallError> {
        let key = &self.item.key;
        let url = self.item.url();
        let (mut reader, content_length) = self.open()?;

        if let Some(ref progress) = self.progress {
            progress.download_started(key, self.item.archive_size.or(content_length));
        }

        let mut file = File::create(dest).map_err(|e| InstallError::extraction(dest, e))?;
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        let mut buffer = vec![0_u8; CHUNK_SIZE];

        loop {
            self.check_cancelled()?;
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(InstallError::network(url, e)),
            };
            hasher.update(&buffer[..read]);
            file.write_all(&buffer[..read])
                .map_err(|e| InstallError::extraction(dest, e))?;
            written += read as u64;

            if let Some(ref progress) = self.progress {
                progress.download_progress(key, written);
            }
        }
        file.flush().map_err(|e| InstallError::extraction(dest, e))?;

        if let Some(expected) = self.item.archive_size {
            if written != expected {
                return Err(InstallError::SizeMismatch {
                    url: url.to_string(),
                    expected,
                    actual: written,
                });
            }
        }

        let actual = hex::encode(hasher.finalize());
        if actual != key.sha256() {
            return Err(InstallError::ChecksumMismatch {
                url: url.to_string(),
                expected: key.sha256().to_string(),
                actual,
            });
        }

        debug!("Verified {} ({} bytes)", key, written);
        Ok(())
    }

    /// Replace an absent or empty target with the unpacked root
    fn move_into_place(&self, root: &Path) -> Result<(), InstallError> {
        match fs::read_dir(&self.target) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Err(InstallError::invalid_target(
                        &self.target,
                        "directory is not empty",
                    ));
                }
                fs::remove_dir(&self.target)
                    .map_err(|e| InstallError::extraction(&self.target, e))?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(InstallError::invalid_target(&self.target, e.to_string())),
        }

        fs::rename(root, &self.target).map_err(|e| InstallError::extraction(&self.target, e))
    }
}

fn unpack_tar_gz(archive: &Path, dest: &Path, cancel: &CancellationToken) -> Result<(), InstallError> {
    let fail = |e: io::Error| InstallError::extraction(dest, e);

    let file = File::open(archive).map_err(fail)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);

    for entry in tar.entries().map_err(fail)? {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let mut entry = entry.map_err(fail)?;
        if !entry.unpack_in(dest).map_err(fail)? {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(InstallError::extraction(
                dest,
                format!("entry escapes destination: {}", name),
            ));
        }
    }
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path, cancel: &CancellationToken) -> Result<(), InstallError> {
    let fail = |e: io::Error| InstallError::extraction(dest, e);

    let file = File::open(archive).map_err(fail)?;
    let mut zip =
        ZipArchive::new(BufReader::new(file)).map_err(|e| InstallError::extraction(dest, e))?;

    for i in 0..zip.len() {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let mut entry = zip
            .by_index(i)
            .map_err(|e| InstallError::extraction(dest, e))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(InstallError::extraction(
                dest,
                format!("entry escapes destination: {}", entry.name()),
            ));
        };
        let out = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(fail)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        let mut outfile = File::create(&out).map_err(fail)?;
        io::copy(&mut entry, &mut outfile).map_err(fail)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out, fs::Permissions::from_mode(mode)).map_err(fail)?;
            }
        }
    }
    Ok(())
}

/// Locate the package root inside the unpacked tree
fn resolve_root(unpacked: &Path, prefix: &str) -> Result<PathBuf, InstallError> {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        return Ok(unpacked.to_path_buf());
    }

    let relative = Path::new(prefix);
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(InstallError::extraction(
            unpacked,
            format!("invalid package root '{}'", prefix),
        ));
    }

    let root = unpacked.join(relative);
    if !root.is_dir() {
        return Err(InstallError::extraction(
            unpacked,
            format!("package root '{}' not found in archive", prefix),
        ));
    }
    Ok(root)
}
