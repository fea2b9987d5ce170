//! Core types shared by the engine, the router and every client.
//!
//! **FFI Support:** Types crossing the editor boundary are annotated with
//! UniFFI macros; paths are carried as `String` there.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Plugin identifier reported with every heartbeat (`--plugin <id>/<version>`).
pub const DEFAULT_PLUGIN_ID: &str = "unreal-wakatime";

/// Project name used when neither the project settings nor the module name give one.
pub const FALLBACK_PROJECT_NAME: &str = "Unreal Engine";

pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

// ═══════════════════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════════════════

/// User settings persisted in the config file. An empty `api_url` means
/// "use the helper's default endpoint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Settings {
    pub api_key: String,
    pub api_url: String,
}

/// Result of scanning the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, uniffi::Record)]
pub struct ConfigSnapshot {
    pub settings: Settings,
    pub found_api_key: bool,
    pub found_api_url: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Activity
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coding,
    Designing,
    Debugging,
}

impl Category {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Designing => "designing",
            Self::Debugging => "debugging",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    File,
    App,
}

impl EntityType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::App => "app",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of editor activity, built per event and consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ActivityEvent {
    pub category: Category,
    pub entity_type: EntityType,
    pub entity_path: String,
    pub language: String,
    pub is_write: bool,
}

/// How a single heartbeat attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, uniffi::Record)]
pub struct HeartbeatOutcome {
    pub success: bool,
    /// Helper exit code, `-1` when the process never produced one.
    pub exit_code: i32,
    pub error_detail: Option<String>,
}

impl HeartbeatOutcome {
    pub fn completed(exit_code: i32) -> Self {
        Self {
            success: true,
            exit_code,
            error_detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: -1,
            error_detail: Some(detail.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helper installation
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, uniffi::Record)]
pub struct HelperInstallation {
    pub platform_architecture_tag: String,
    pub executable_path: String,
    pub installed: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runtime context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-process facts about the host editor, built once at startup and passed
/// by reference into every dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    pub project_name: String,
    pub project_path: String,
    pub plugin_id: String,
    pub plugin_version: String,
    pub heartbeat_timeout: Duration,
}

impl RuntimeContext {
    pub fn new(
        project_name: impl Into<String>,
        project_path: impl Into<String>,
        plugin_version: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            project_path: project_path.into(),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            plugin_version: plugin_version.into(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }

    pub fn with_plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = plugin_id.into();
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// `<plugin_id>/<plugin_version>` as sent with `--plugin`.
    pub fn plugin_tag(&self) -> String {
        format!("{}/{}", self.plugin_id, self.plugin_version)
    }
}

/// Picks the project name the way the editor exposes it: the name from the
/// project settings wins, then the main module name, then a fixed fallback.
pub fn resolve_project_name(configured: Option<&str>, module_name: Option<&str>) -> String {
    [configured, module_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(FALLBACK_PROJECT_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_project_name_prefers_configured() {
        assert_eq!(
            resolve_project_name(Some("Shooter Game"), Some("ShooterModule")),
            "Shooter Game"
        );
    }

    #[test]
    fn test_resolve_project_name_falls_back_to_module() {
        assert_eq!(
            resolve_project_name(Some("  "), Some("ShooterModule")),
            "ShooterModule"
        );
        assert_eq!(resolve_project_name(None, Some("ShooterModule")), "ShooterModule");
    }

    #[test]
    fn test_resolve_project_name_fallback() {
        assert_eq!(resolve_project_name(None, None), FALLBACK_PROJECT_NAME);
        assert_eq!(resolve_project_name(Some(""), Some("")), FALLBACK_PROJECT_NAME);
    }

    #[test]
    fn test_plugin_tag() {
        let ctx = RuntimeContext::new("Game", "/work/game", "1.4.2");
        assert_eq!(ctx.plugin_tag(), "unreal-wakatime/1.4.2");

        let ctx = ctx.with_plugin_id("custom-editor");
        assert_eq!(ctx.plugin_tag(), "custom-editor/1.4.2");
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Debugging).unwrap();
        assert_eq!(json, "\"debugging\"");
        assert_eq!(EntityType::App.to_string(), "app");
    }
}
