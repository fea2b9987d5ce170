//! Line-oriented settings file shared with the helper.
//!
//! The file is INI-like and other tools write to it too, so the store only
//! ever touches the `api_key` and `api_url` lines. Everything else (comments,
//! other sections, keys it doesn't know) is copied through verbatim.
//!
//! ```text
//! [settings]
//! debug = false
//! api_key = waka_0000
//! api_url = https://example.test/api/v1
//! ```
//!
//! Writes are atomic (temp + rename) so a reader never sees half a file.

use crate::error::{Result, WakaError};
use crate::types::{ConfigSnapshot, Settings};
use fs_err as fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;

const SECTION_HEADER: &str = "[settings]";
const SEPARATOR: &str = " = ";
const API_KEY: &str = "api_key";
const API_URL: &str = "api_url";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    ApiKey,
    ApiUrl,
}

impl Key {
    const fn name(self) -> &'static str {
        match self {
            Key::ApiKey => API_KEY,
            Key::ApiUrl => API_URL,
        }
    }
}

/// Recognizes the key a line sets, if it is one of ours.
fn classify(line: &str) -> Option<Key> {
    let trimmed = line.trim_start();
    [Key::ApiKey, Key::ApiUrl].into_iter().find(|key| {
        trimmed
            .strip_prefix(key.name())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '=']))
    })
}

/// Value after the first `" = "`, or `None` for a malformed line.
fn value_of(line: &str) -> Option<&str> {
    line.find(SEPARATOR)
        .map(|idx| line[idx + SEPARATOR.len()..].trim_end_matches('\r'))
}

/// Parses config text. The first well-formed occurrence of each key wins.
pub fn parse_settings(content: &str) -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::default();

    for line in content.lines() {
        let Some(key) = classify(line) else {
            continue;
        };
        let Some(value) = value_of(line) else {
            tracing::debug!(key = key.name(), "Skipping config line without separator");
            continue;
        };
        match key {
            Key::ApiKey if !snapshot.found_api_key => {
                snapshot.settings.api_key = value.to_string();
                snapshot.found_api_key = true;
            }
            Key::ApiUrl if !snapshot.found_api_url => {
                snapshot.settings.api_url = value.to_string();
                snapshot.found_api_url = true;
            }
            _ => {}
        }
    }

    snapshot
}

/// Produces the file content for `settings`, merged into `existing` lines.
///
/// - the first `api_key`/`api_url` line is rewritten in place
/// - later duplicates of either key are dropped
/// - an empty URL removes the `api_url` line
/// - missing lines go right after the `[settings]` header (added if absent)
/// - every other line is kept as-is, in order
pub fn render_settings(existing: Option<&str>, settings: &Settings) -> String {
    let key_line = format!("{API_KEY}{SEPARATOR}{}", settings.api_key);
    let url_line = (!settings.api_url.is_empty())
        .then(|| format!("{API_URL}{SEPARATOR}{}", settings.api_url));

    let mut lines: Vec<String> = Vec::new();
    let mut wrote_key = false;
    let mut wrote_url = false;

    for line in existing.unwrap_or_default().lines() {
        match classify(line) {
            Some(Key::ApiKey) => {
                if !wrote_key {
                    lines.push(key_line.clone());
                    wrote_key = true;
                }
            }
            Some(Key::ApiUrl) => {
                if !wrote_url {
                    if let Some(url) = &url_line {
                        lines.push(url.clone());
                    }
                    wrote_url = true;
                }
            }
            None => lines.push(line.trim_end_matches('\r').to_string()),
        }
    }

    let mut missing = Vec::new();
    if !wrote_key {
        missing.push(key_line);
    }
    if let (false, Some(url)) = (wrote_url, url_line) {
        missing.push(url);
    }

    if !missing.is_empty() {
        match lines.iter().position(|l| l.trim() == SECTION_HEADER) {
            Some(header) => {
                let at = header + 1;
                lines.splice(at..at, missing);
            }
            None => {
                let mut fresh = vec![SECTION_HEADER.to_string()];
                fresh.extend(missing);
                fresh.append(&mut lines);
                lines = fresh;
            }
        }
    }

    let ending = line_ending(existing);
    let mut content = lines.join(ending);
    content.push_str(ending);
    content
}

/// CRLF when the existing file already uses it, LF otherwise.
fn line_ending(existing: Option<&str>) -> &'static str {
    match existing {
        Some(text) if text.contains("\r\n") => "\r\n",
        _ => "\n",
    }
}

/// Owner and sole writer of the settings file.
///
/// Reads and writes inside one process are serialized by the lock; the rename
/// on write keeps other processes (the helper) from seeing a partial file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the file is present and can be opened for reading.
    pub fn exists(&self) -> bool {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.path.is_file() && fs::File::open(&self.path).is_ok()
    }

    /// Loads settings. A missing file yields an empty snapshot.
    pub fn load(&self) -> Result<ConfigSnapshot> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        if !self.path.exists() {
            return Ok(ConfigSnapshot::default());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|source| WakaError::ConfigRead {
                path: self.path.clone(),
                source,
            })?;
        Ok(parse_settings(&content))
    }

    /// Loads settings, degrading to defaults (with a warning) on read errors.
    pub fn load_or_default(&self) -> ConfigSnapshot {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Config unreadable; using defaults");
            ConfigSnapshot::default()
        })
    }

    /// Persists `settings`, preserving every unrelated line.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        let existing = if self.path.exists() {
            Some(
                fs::read_to_string(&self.path).map_err(|source| WakaError::ConfigRead {
                    path: self.path.clone(),
                    source,
                })?,
            )
        } else {
            None
        };

        let content = render_settings(existing.as_deref(), settings);
        self.write_atomic(&content)?;

        tracing::info!(
            path = %self.path.display(),
            has_api_url = !settings.api_url.is_empty(),
            "Settings saved"
        );
        Ok(())
    }

    /// The file a save lands on. A symlinked config (dotfiles) is written
    /// through, so the link itself stays in place.
    fn write_target(&self) -> PathBuf {
        let is_link = fs::symlink_metadata(&self.path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return self.path.clone();
        }
        if let Ok(resolved) = fs::canonicalize(&self.path) {
            return resolved;
        }
        // Dangling link: follow one hop so the save creates its target.
        match fs::read_link(&self.path) {
            Ok(target) if target.is_absolute() => target,
            Ok(target) => self
                .path
                .parent()
                .map(|dir| dir.join(&target))
                .unwrap_or(target),
            Err(_) => self.path.clone(),
        }
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        let target = self.write_target();
        let write_err = |details: String| WakaError::ConfigWrite {
            path: target.clone(),
            details,
        };

        let dir = target
            .parent()
            .ok_or_else(|| write_err("Config path has no parent directory".to_string()))?;
        if !dir.is_dir() {
            return Err(write_err(format!(
                "Directory does not exist: {}",
                dir.display()
            )));
        }

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| write_err(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| write_err(format!("Failed to write settings: {}", e)))?;
        temp.flush()
            .map_err(|e| write_err(format!("Failed to flush settings: {}", e)))?;
        temp.persist(&target)
            .map_err(|e| write_err(format!("Failed to persist settings: {}", e.error)))?;
        Ok(())
    }
}
