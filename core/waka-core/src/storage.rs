//! Storage configuration and path management.
//!
//! Every file the tracker touches hangs off one user root (the home directory
//! by default). Keeping the layout here means the rest of the crate never
//! builds a path by hand, and tests can point the whole thing at a temp dir.
//!
//! ```text
//! <root>/
//! ├── .wakatime.cfg               # user settings (api_key, api_url, ...)
//! └── .wakatime/
//!     ├── wakatime.log              # helper's own log file
//!     ├── wakatime-cli.zip          # last downloaded helper archive
//!     ├── wakatime-cli-<os>-<arch>  # shared install used by other IDE plugins
//!     └── wakatime-cli/             # install managed by this plugin
//! ```

use crate::error::{Result, WakaError};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the user root, same variable the helper itself honors.
pub const HOME_ENV: &str = "WAKATIME_HOME";

const CONFIG_FILE_NAME: &str = ".wakatime.cfg";
const DATA_DIR_NAME: &str = ".wakatime";
const HELPER_LOG_NAME: &str = "wakatime.log";
const MANAGED_DIR_NAME: &str = "wakatime-cli";
const ARCHIVE_NAME: &str = "wakatime-cli.zip";

/// Central configuration for all tracker storage paths.
///
/// Production code uses `StorageConfig::from_env()`.
/// Tests use `StorageConfig::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the user root from `WAKATIME_HOME`, falling back to the home directory.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        dirs::home_dir()
            .map(Self::with_root)
            .ok_or(WakaError::HomeDirNotFound)
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the settings file read by both this plugin and the helper.
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Directory holding helper binaries, archives and logs.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR_NAME)
    }

    /// Log file handed to the helper via `--log-file`.
    pub fn helper_log_file(&self) -> PathBuf {
        self.data_dir().join(HELPER_LOG_NAME)
    }

    /// Install directory owned by this plugin.
    pub fn managed_install_dir(&self) -> PathBuf {
        self.data_dir().join(MANAGED_DIR_NAME)
    }

    /// Where a downloaded helper archive is kept (left behind on extraction failure).
    pub fn archive_file(&self) -> PathBuf {
        self.data_dir().join(ARCHIVE_NAME)
    }

    /// Candidate helper locations in lookup order: the shared install other
    /// IDE integrations drop into the data dir, then our managed install.
    pub fn helper_search_paths(&self, helper_file_name: &str) -> Vec<PathBuf> {
        vec![
            self.data_dir().join(helper_file_name),
            self.managed_install_dir().join(helper_file_name),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_hang_off_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/home/dev"));

        assert_eq!(storage.config_file(), PathBuf::from("/home/dev/.wakatime.cfg"));
        assert_eq!(storage.data_dir(), PathBuf::from("/home/dev/.wakatime"));
        assert_eq!(
            storage.helper_log_file(),
            PathBuf::from("/home/dev/.wakatime/wakatime.log")
        );
        assert_eq!(
            storage.archive_file(),
            PathBuf::from("/home/dev/.wakatime/wakatime-cli.zip")
        );
    }

    #[test]
    fn test_search_paths_prefer_shared_install() {
        let storage = StorageConfig::with_root(PathBuf::from("/home/dev"));
        let paths = storage.helper_search_paths("wakatime-cli-linux-amd64");

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/home/dev/.wakatime/wakatime-cli-linux-amd64"),
                PathBuf::from("/home/dev/.wakatime/wakatime-cli/wakatime-cli-linux-amd64"),
            ]
        );
    }
}
