//! Startup checks for the tracker.
//!
//! This module handles:
//! - Provisioning the helper executable (download on first run)
//! - Checking that the settings file exists and carries an API key
//! - Asking the host to show its settings prompt when it doesn't
//!
//! Nothing here fails the host. Every problem ends up in `SetupStatus` and
//! the log, and heartbeats degrade until it is resolved.

use crate::config::ConfigStore;
use crate::provision::CliProvisioner;
use crate::types::{HelperInstallation, Settings};
use serde::Serialize;
use std::sync::Arc;

/// Called with the settings the user confirmed.
pub type SaveCallback = Box<dyn FnOnce(Settings) + Send>;

/// A settings editor supplied by the host (a window, a terminal prompt, ...).
///
/// The core never references widget types; it only asks the UI to show the
/// current values and waits for `on_save` to be called (or not, if the user
/// dismisses it).
pub trait SettingsUi {
    fn show(&self, current: &Settings, on_save: SaveCallback);
}

#[derive(Debug, Clone, Serialize, uniffi::Record)]
pub struct SetupStatus {
    pub helper: HelperInstallation,
    pub config_exists: bool,
    pub api_key_found: bool,
    pub api_url_found: bool,
    /// The settings prompt must be shown (missing file or API key).
    pub needs_settings_prompt: bool,
    pub blocking_reason: Option<String>,
}

pub struct SetupChecker<'a> {
    config: &'a Arc<ConfigStore>,
    provisioner: &'a CliProvisioner,
}

impl<'a> SetupChecker<'a> {
    pub fn new(config: &'a Arc<ConfigStore>, provisioner: &'a CliProvisioner) -> Self {
        Self {
            config,
            provisioner,
        }
    }

    /// Read-only status; never touches the network.
    pub fn check_setup_status(&self) -> SetupStatus {
        let helper = self.provisioner.installation();
        let config_exists = self.config.exists();
        let snapshot = self.config.load_or_default();

        let needs_settings_prompt = !config_exists || !snapshot.found_api_key;

        let blocking_reason = if !helper.installed {
            Some(format!(
                "Helper not installed at {}",
                helper.executable_path
            ))
        } else if !config_exists {
            Some("Config file not found".to_string())
        } else if !snapshot.found_api_key {
            Some("API key not found in config file".to_string())
        } else {
            None
        };

        SetupStatus {
            helper,
            config_exists,
            api_key_found: snapshot.found_api_key,
            api_url_found: snapshot.found_api_url,
            needs_settings_prompt,
            blocking_reason,
        }
    }

    /// Ensures the helper is installed. Failures are logged and leave the
    /// tracker in degraded mode.
    pub fn provision_helper(&self) -> HelperInstallation {
        if let Err(err) = self.provisioner.ensure_default_installed() {
            tracing::error!(error = %err, "Error installing helper. Please install it manually.");
        }
        self.provisioner.installation()
    }

    /// Full startup flow: provision, check config, prompt if needed.
    pub fn run_startup(&self, ui: Option<&dyn SettingsUi>) -> SetupStatus {
        self.provision_helper();
        let status = self.check_setup_status();

        if !status.api_url_found && status.config_exists {
            tracing::warn!("API url not found in config file");
        }

        if status.needs_settings_prompt {
            if status.config_exists {
                tracing::warn!("API key not found in config file");
            } else {
                tracing::warn!(path = %self.config.path().display(), "Config file not found");
            }
            match ui {
                Some(ui) => prompt_for_settings(self.config, ui),
                None => tracing::warn!("No settings UI available to prompt for an API key"),
            }
        }

        status
    }
}

/// Shows `ui` with the current settings and saves whatever it confirms.
pub fn prompt_for_settings(config: &Arc<ConfigStore>, ui: &dyn SettingsUi) {
    let current = config.load_or_default().settings;
    let store = Arc::clone(config);
    ui.show(
        &current,
        Box::new(move |settings| {
            if let Err(err) = store.save(&settings) {
                tracing::error!(error = %err, "Failed to save settings");
            }
        }),
    );
}
