//! Locating and installing the helper executable.
//!
//! The helper (`wakatime-cli`) is shared with other editor integrations, so an
//! existing install under the data dir is reused as-is. Only when nothing is
//! found do we fetch the release archive for this platform and unpack it into
//! our own install directory.
//!
//! ## Failure handling
//!
//! Download and extraction fail independently:
//! - a failed download never attempts extraction and leaves no archive behind
//! - a failed extraction leaves the archive on disk for a human to inspect
//!
//! Neither is fatal. Heartbeats keep failing at launch until a helper appears.

use crate::error::{Result, WakaError};
use crate::storage::StorageConfig;
use crate::types::HelperInstallation;
use fs_err as fs;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const RELEASE_BASE_URL: &str = "https://github.com/wakatime/wakatime-cli/releases/latest/download";
const DOWNLOAD_TIMEOUT_SECS: u64 = 120;
const USER_AGENT: &str = concat!("waka-core/", env!("CARGO_PKG_VERSION"));

/// Architecture tag used in release asset names.
///
/// A 32-bit build running under WOW64 still reports the 64-bit tag, so the
/// native helper gets installed.
pub fn architecture_tag() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" if running_under_wow64() => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    }
}

fn running_under_wow64() -> bool {
    cfg!(windows) && env::var_os("PROCESSOR_ARCHITEW6432").is_some()
}

/// Operating system tag used in release asset names.
pub fn os_tag() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// `wakatime-cli-<os>-<arch>`, plus `.exe` on Windows.
pub fn helper_file_name() -> String {
    format!(
        "wakatime-cli-{}-{}{}",
        os_tag(),
        architecture_tag(),
        env::consts::EXE_SUFFIX
    )
}

/// Release archive for this platform.
pub fn download_url() -> String {
    format!(
        "{}/wakatime-cli-{}-{}.zip",
        RELEASE_BASE_URL,
        os_tag(),
        architecture_tag()
    )
}

/// First candidate that exists as a file, checked in the given order.
pub fn locate(search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths.iter().find(|p| p.is_file()).cloned()
}

/// Ensures the helper is available, downloading it on first use.
#[derive(Debug, Clone)]
pub struct CliProvisioner {
    storage: StorageConfig,
    helper_name: String,
}

impl CliProvisioner {
    pub fn new(storage: StorageConfig) -> Self {
        Self::with_helper_name(storage, helper_file_name())
    }

    /// Used by tests to pin the asset name independent of the build target.
    pub fn with_helper_name(storage: StorageConfig, helper_name: impl Into<String>) -> Self {
        Self {
            storage,
            helper_name: helper_name.into(),
        }
    }

    pub fn helper_name(&self) -> &str {
        &self.helper_name
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.storage.helper_search_paths(&self.helper_name)
    }

    /// Path of an installed helper, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        locate(&self.search_paths())
    }

    /// Path heartbeats should run: the located helper, or where the managed
    /// install will put it (launch then fails until it exists).
    pub fn helper_path(&self) -> PathBuf {
        self.locate().unwrap_or_else(|| {
            self.storage
                .managed_install_dir()
                .join(&self.helper_name)
        })
    }

    pub fn installation(&self) -> HelperInstallation {
        let located = self.locate();
        HelperInstallation {
            platform_architecture_tag: architecture_tag().to_string(),
            installed: located.is_some(),
            executable_path: located
                .unwrap_or_else(|| self.helper_path())
                .to_string_lossy()
                .to_string(),
        }
    }

    /// Installs into the managed directory from the platform release URL.
    pub fn ensure_default_installed(&self) -> Result<PathBuf> {
        self.ensure_installed(&self.storage.managed_install_dir(), &download_url())
    }

    /// Returns the helper path, fetching and unpacking `download_url` into
    /// `install_dir` when no helper can be located. Idempotent: a present
    /// helper means no network access at all.
    pub fn ensure_installed(&self, install_dir: &Path, download_url: &str) -> Result<PathBuf> {
        let mut candidates = self.search_paths();
        let target = install_dir.join(&self.helper_name);
        if !candidates.contains(&target) {
            candidates.push(target.clone());
        }

        if let Some(found) = locate(&candidates) {
            tracing::debug!(path = %found.display(), "Helper found");
            return Ok(found);
        }

        tracing::info!(url = %download_url, "Helper not found, attempting download");

        fs::create_dir_all(install_dir).map_err(|source| WakaError::Io {
            context: format!("Failed to create install directory {}", install_dir.display()),
            source,
        })?;

        let archive = self.storage.archive_file();
        download_archive(download_url, &archive)?;
        tracing::info!(path = %archive.display(), "Downloaded helper archive");

        extract_archive(&archive, install_dir)?;

        if !target.is_file() {
            return Err(WakaError::Extract {
                archive,
                details: format!("Archive did not contain {}", self.helper_name),
            });
        }
        mark_executable(&target)?;

        tracing::info!(path = %target.display(), "Helper installed");
        Ok(target)
    }
}

/// Streams `url` into a temp file beside `dest`, renaming it into place only
/// once the whole body has arrived.
fn download_archive(url: &str, dest: &Path) -> Result<()> {
    let download_err = |details: String| WakaError::Download {
        url: url.to_string(),
        details,
    };

    let dir = dest
        .parent()
        .ok_or_else(|| download_err("Archive path has no parent directory".to_string()))?;
    fs::create_dir_all(dir)
        .map_err(|e| download_err(format!("Failed to create download directory: {}", e)))?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| download_err(format!("Failed to build HTTP client: {}", e)))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| download_err(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(download_err(format!("HTTP {}", response.status())));
    }

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| download_err(format!("Failed to create temp file: {}", e)))?;
    response
        .copy_to(&mut temp)
        .map_err(|e| download_err(format!("Failed to read response body: {}", e)))?;
    temp.flush()
        .map_err(|e| download_err(format!("Failed to flush archive: {}", e)))?;
    temp.persist(dest)
        .map_err(|e| download_err(format!("Failed to persist archive: {}", e.error)))?;
    Ok(())
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let extract_err = |details: String| WakaError::Extract {
        archive: archive.to_path_buf(),
        details,
    };

    let file = fs::File::open(archive)
        .map_err(|e| extract_err(format!("Failed to open archive: {}", e)))?;

    let mut zip = zip::ZipArchive::new(file).map_err(|e| extract_err(e.to_string()))?;
    zip.extract(dest).map_err(|e| extract_err(e.to_string()))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let io_err = |source| WakaError::Io {
        context: format!("Failed to mark {} executable", path.display()),
        source,
    };
    let mut perms = fs::metadata(path).map_err(io_err)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).map_err(io_err)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
