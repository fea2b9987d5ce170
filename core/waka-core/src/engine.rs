//! WakaEngine - the main entry point for editor hosts.
//!
//! The engine owns everything a host would otherwise keep in globals: paths,
//! project facts, the config store, the provisioner and the dispatcher. It is:
//! - **Synchronous**: `on_activity` blocks; `report_activity` hands off to a worker
//! - **Re-reading**: settings are loaded for every heartbeat, never cached
//! - **Stable**: prefer additive API changes to avoid breaking FFI clients
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use waka_core::{ActivityEvent, Category, EntityType, WakaEngine};
//!
//! let engine = WakaEngine::new("Shooter".into(), "/work/shooter".into(), "1.0.0".into())?;
//! engine.startup();
//! let outcome = engine.on_activity(ActivityEvent {
//!     category: Category::Designing,
//!     entity_type: EntityType::App,
//!     entity_path: "Unreal Editor".into(),
//!     language: "Unreal Editor".into(),
//!     is_write: false,
//! });
//! ```

use crate::config::ConfigStore;
use crate::error::WakaFfiError;
use crate::heartbeat::{HeartbeatDispatcher, HelperFiles};
use crate::provision::CliProvisioner;
use crate::router::{ActivityEventRouter, EditorEvent};
use crate::setup::{prompt_for_settings, SettingsUi, SetupChecker, SetupStatus};
use crate::storage::StorageConfig;
use crate::types::{
    ActivityEvent, ConfigSnapshot, HeartbeatOutcome, HelperInstallation, RuntimeContext, Settings,
};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(uniffi::Object)]
pub struct WakaEngine {
    storage: StorageConfig,
    context: RuntimeContext,
    config: Arc<ConfigStore>,
    provisioner: CliProvisioner,
    dispatcher: HeartbeatDispatcher,
    router: ActivityEventRouter,
}

impl WakaEngine {
    /// Creates an engine over explicit storage. Not exposed to FFI.
    pub fn with_storage(storage: StorageConfig, context: RuntimeContext) -> Self {
        let provisioner = CliProvisioner::new(storage.clone());
        Self::with_parts(storage, context, provisioner)
    }

    /// Creates an engine with a preconfigured provisioner (tests pin the helper name).
    pub fn with_parts(
        storage: StorageConfig,
        context: RuntimeContext,
        provisioner: CliProvisioner,
    ) -> Self {
        let config = Arc::new(ConfigStore::new(storage.config_file()));
        let dispatcher = HeartbeatDispatcher::new(HelperFiles {
            config_file: storage.config_file(),
            log_file: storage.helper_log_file(),
        });

        // Sink holds its own handles; no reference back to the engine.
        let sink_config = Arc::clone(&config);
        let sink_provisioner = provisioner.clone();
        let sink_dispatcher = dispatcher.clone();
        let sink_context = context.clone();
        let router = ActivityEventRouter::new(Arc::new(move |event: ActivityEvent| {
            dispatch_in_background(
                &sink_config,
                &sink_provisioner,
                &sink_dispatcher,
                &sink_context,
                event,
                |_| {},
            );
        }));

        Self {
            storage,
            context,
            config,
            provisioner,
            dispatcher,
            router,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn provisioner(&self) -> &CliProvisioner {
        &self.provisioner
    }

    /// Startup with a host-provided settings prompt.
    pub fn startup_with_ui(&self, ui: &dyn SettingsUi) -> SetupStatus {
        SetupChecker::new(&self.config, &self.provisioner).run_startup(Some(ui))
    }

    /// "Settings requested" entry point: shows `ui` and saves what it confirms.
    pub fn open_settings(&self, ui: &dyn SettingsUi) {
        prompt_for_settings(&self.config, ui);
    }

    /// Fire-and-forget dispatch with a custom completion callback.
    pub fn report_activity_with<F>(&self, event: ActivityEvent, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(HeartbeatOutcome) + Send + 'static,
    {
        dispatch_in_background(
            &self.config,
            &self.provisioner,
            &self.dispatcher,
            &self.context,
            event,
            on_done,
        )
    }

    /// Router wired to this engine: every routed activity becomes a
    /// background heartbeat. Blueprint tracking lives as long as the engine.
    pub fn router(&self) -> &ActivityEventRouter {
        &self.router
    }
}

fn dispatch_in_background<F>(
    config: &ConfigStore,
    provisioner: &CliProvisioner,
    dispatcher: &HeartbeatDispatcher,
    context: &RuntimeContext,
    event: ActivityEvent,
    on_done: F,
) -> JoinHandle<()>
where
    F: FnOnce(HeartbeatOutcome) + Send + 'static,
{
    let settings = config.load_or_default().settings;
    dispatcher.dispatch(
        settings,
        provisioner.helper_path(),
        event,
        context.clone(),
        on_done,
    )
}

#[uniffi::export]
impl WakaEngine {
    /// Creates an engine rooted at the user's home directory (or `WAKATIME_HOME`).
    #[uniffi::constructor]
    pub fn new(
        project_name: String,
        project_path: String,
        plugin_version: String,
    ) -> Result<Self, WakaFfiError> {
        let storage = StorageConfig::from_env()?;
        let context = RuntimeContext::new(project_name, project_path, plugin_version);
        Ok(Self::with_storage(storage, context))
    }

    /// Path to the settings file as a string.
    pub fn config_path(&self) -> String {
        self.storage.config_file().to_string_lossy().to_string()
    }

    /// Provisions the helper and checks the config. Hosts without a settings
    /// UI check `needs_settings_prompt` and open their own.
    pub fn startup(&self) -> SetupStatus {
        SetupChecker::new(&self.config, &self.provisioner).run_startup(None)
    }

    pub fn setup_status(&self) -> SetupStatus {
        SetupChecker::new(&self.config, &self.provisioner).check_setup_status()
    }

    pub fn helper_installation(&self) -> HelperInstallation {
        self.provisioner.installation()
    }

    pub fn load_settings(&self) -> Result<ConfigSnapshot, WakaFfiError> {
        self.config.load().map_err(WakaFfiError::from)
    }

    pub fn save_settings(&self, settings: Settings) -> Result<(), WakaFfiError> {
        self.config.save(&settings).map_err(WakaFfiError::from)
    }

    /// Sends one heartbeat and waits for the helper.
    pub fn on_activity(&self, event: ActivityEvent) -> HeartbeatOutcome {
        let settings = self.config.load_or_default().settings;
        let helper = self.provisioner.helper_path();
        self.dispatcher
            .send_heartbeat(&settings, &helper, &event, &self.context)
    }

    /// Sends one heartbeat on a worker thread; the outcome only reaches the log.
    pub fn report_activity(&self, event: ActivityEvent) {
        self.report_activity_with(event, |_| {});
    }

    /// Feeds one editor notification through the router. Returns the activity
    /// that was reported in the background, if the event produced one.
    pub fn publish_event(&self, event: EditorEvent) -> Option<ActivityEvent> {
        self.router.publish(&event)
    }

    /// Settings were edited outside the engine.
    pub fn config_changed(&self) {
        self.router.config_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, EntityType};
    use fs_err as fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn engine_in(temp: &TempDir) -> WakaEngine {
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        fs::create_dir_all(storage.data_dir()).unwrap();
        let provisioner = CliProvisioner::with_helper_name(storage.clone(), "helper-bin");
        WakaEngine::with_parts(
            storage,
            RuntimeContext::new("Game", "/work/game", "0.0.1"),
            provisioner,
        )
    }

    fn designing() -> ActivityEvent {
        ActivityEvent {
            category: Category::Designing,
            entity_type: EntityType::App,
            entity_path: "Unreal Editor".to_string(),
            language: "Unreal Editor".to_string(),
            is_write: false,
        }
    }

    #[test]
    fn test_on_activity_without_helper_fails_softly() {
        let temp = TempDir::new().unwrap();
        let engine = engine_in(&temp);

        let outcome = engine.on_activity(designing());

        assert!(!outcome.success);
        assert!(outcome.error_detail.is_some());
    }

    #[test]
    fn test_settings_round_trip_through_engine() {
        let temp = TempDir::new().unwrap();
        let engine = engine_in(&temp);

        engine
            .save_settings(Settings {
                api_key: "waka_abc".to_string(),
                api_url: String::new(),
            })
            .unwrap();

        let snapshot = engine.load_settings().unwrap();
        assert!(snapshot.found_api_key);
        assert_eq!(snapshot.settings.api_key, "waka_abc");
        assert!(engine.setup_status().config_exists);
    }

    #[test]
    fn test_helper_installation_points_at_managed_dir() {
        let temp = TempDir::new().unwrap();
        let engine = engine_in(&temp);

        let installation = engine.helper_installation();
        assert!(!installation.installed);
        assert_eq!(
            PathBuf::from(installation.executable_path),
            engine.storage().managed_install_dir().join("helper-bin")
        );
    }

    #[test]
    fn test_publish_event_routes_through_engine() {
        let temp = TempDir::new().unwrap();
        let engine = engine_in(&temp);

        let routed = engine.publish_event(EditorEvent::WorldSaved);
        assert!(routed.is_some_and(|a| a.is_write));
    }

    #[test]
    fn test_blueprint_tracking_persists_across_publishes() {
        let temp = TempDir::new().unwrap();
        let engine = engine_in(&temp);
        let compile = EditorEvent::BlueprintCompiled {
            name: "BP_Door".to_string(),
            file_path: "/work/game/Content/BP_Door.uasset".to_string(),
        };

        assert!(engine.publish_event(compile.clone()).is_none());

        engine.publish_event(EditorEvent::AssetOpened {
            name: "BP_Door".to_string(),
            is_blueprint: true,
        });
        let activity = engine.publish_event(compile).unwrap();
        assert_eq!(activity.category, Category::Coding);
        assert!(engine.router().is_blueprint_open("BP_Door"));
    }
}
