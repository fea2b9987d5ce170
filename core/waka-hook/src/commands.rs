//! Subcommand implementations.
//!
//! Every command builds a fresh `WakaEngine`; there is no state between
//! invocations beyond the config file and the helper install.

use crate::terminal_ui::{mask_key, TerminalUi};
use crate::{CategoryArg, EntityTypeArg};
use clap::Args;
use serde::Serialize;
use std::env;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use waka_core::{
    resolve_project_name, ActivityEvent, ActivityEventRouter, ConfigSnapshot, EditorEvent,
    RuntimeContext, Settings, StorageConfig, WakaEngine, WakaError, DEFAULT_PLUGIN_ID,
};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Core(#[from] WakaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),

    #[error("Nothing to set: pass --api-key and/or --api-url")]
    NothingToSet,
}

#[derive(Args, Debug)]
pub struct HeartbeatArgs {
    #[arg(long, value_enum)]
    pub category: CategoryArg,

    #[arg(long, value_enum)]
    pub entity_type: EntityTypeArg,

    /// File path, or the app name for editor-wide activity
    #[arg(long)]
    pub entity: String,

    #[arg(long, default_value = "")]
    pub language: String,

    /// Mark the heartbeat as a save
    #[arg(long)]
    pub write: bool,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Project and plugin facts shared by every heartbeat-sending command.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[arg(long, env = "WAKA_PROJECT")]
    pub project: Option<String>,

    /// Defaults to the current directory
    #[arg(long, env = "WAKA_PROJECT_FOLDER")]
    pub project_folder: Option<String>,

    #[arg(long, default_value = DEFAULT_PLUGIN_ID)]
    pub plugin_id: String,

    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub plugin_version: String,

    /// Seconds to wait for the helper before killing it
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ProjectArgs {
    fn context(&self) -> RuntimeContext {
        let project_folder = self.project_folder.clone().unwrap_or_else(|| {
            env::current_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        let folder_name = std::path::Path::new(&project_folder)
            .file_name()
            .map(|n| n.to_string_lossy().to_string());

        RuntimeContext::new(
            resolve_project_name(self.project.as_deref(), folder_name.as_deref()),
            project_folder,
            self.plugin_version.clone(),
        )
        .with_plugin_id(self.plugin_id.clone())
        .with_heartbeat_timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl HeartbeatArgs {
    fn event(&self) -> ActivityEvent {
        ActivityEvent {
            category: self.category.into(),
            entity_type: self.entity_type.into(),
            entity_path: self.entity.clone(),
            language: self.language.clone(),
            is_write: self.write,
        }
    }
}

fn engine(context: RuntimeContext) -> Result<WakaEngine, CommandError> {
    Ok(WakaEngine::with_storage(StorageConfig::from_env()?, context))
}

/// Commands that don't send heartbeats still need a context for the engine.
fn idle_engine() -> Result<WakaEngine, CommandError> {
    engine(RuntimeContext::new(
        resolve_project_name(None, None),
        String::new(),
        env!("CARGO_PKG_VERSION"),
    ))
}

pub fn heartbeat(args: HeartbeatArgs) -> Result<(), CommandError> {
    let engine = engine(args.project.context())?;
    let outcome = engine.on_activity(args.event());
    if !outcome.success {
        eprintln!(
            "heartbeat not sent: {}",
            outcome.error_detail.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Routes newline-delimited JSON editor events from stdin until EOF.
/// Heartbeats are sent synchronously so none is lost when input ends.
pub fn events(project: ProjectArgs) -> Result<(), CommandError> {
    let engine = engine(project.context())?;
    // Routing only; heartbeats go out through `on_activity` below.
    let router = ActivityEventRouter::new(Arc::new(|_: ActivityEvent| {}));

    let routed = route_events(&router, io::stdin().lock(), |activity| {
        let outcome = engine.on_activity(activity);
        if !outcome.success {
            eprintln!(
                "heartbeat not sent: {}",
                outcome.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
    })?;
    tracing::debug!(routed, "Event stream ended");
    Ok(())
}

/// Feeds each JSON line to `router`, passing produced activity to `send`.
/// Malformed lines are logged and skipped. Returns how many activities were sent.
fn route_events<R, F>(router: &ActivityEventRouter, input: R, mut send: F) -> io::Result<usize>
where
    R: BufRead,
    F: FnMut(ActivityEvent),
{
    let mut routed = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EditorEvent>(&line) {
            Ok(event) => {
                if let Some(activity) = router.publish(&event) {
                    send(activity);
                    routed += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, line = %line, "Skipping malformed editor event");
                eprintln!("skipping malformed event: {}", e);
            }
        }
    }
    Ok(routed)
}

pub fn install() -> Result<(), CommandError> {
    let engine = idle_engine()?;
    let path = engine.provisioner().ensure_default_installed()?;
    println!("{}", path.display());
    Ok(())
}

pub fn status(json: bool) -> Result<(), CommandError> {
    let status = idle_engine()?.setup_status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!(
        "helper:    {} ({})",
        status.helper.executable_path,
        if status.helper.installed { "installed" } else { "missing" }
    );
    println!("arch:      {}", status.helper.platform_architecture_tag);
    println!("config:    {}", yes_no(status.config_exists));
    println!("api key:   {}", yes_no(status.api_key_found));
    println!("api url:   {}", yes_no(status.api_url_found));
    if let Some(reason) = status.blocking_reason {
        println!("problem:   {}", reason);
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigView {
    path: String,
    api_key: String,
    api_url: String,
    found_api_key: bool,
    found_api_url: bool,
}

impl ConfigView {
    fn new(path: String, snapshot: ConfigSnapshot) -> Self {
        Self {
            path,
            api_key: mask_key(&snapshot.settings.api_key),
            api_url: snapshot.settings.api_url,
            found_api_key: snapshot.found_api_key,
            found_api_url: snapshot.found_api_url,
        }
    }
}

pub fn config_show(json: bool) -> Result<(), CommandError> {
    let engine = idle_engine()?;
    let snapshot = engine.config_store().load()?;
    let view = ConfigView::new(engine.config_path(), snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("# {}", view.path);
        if view.found_api_key {
            println!("api_key = {}", view.api_key);
        }
        if view.found_api_url {
            println!("api_url = {}", view.api_url);
        }
    }
    Ok(())
}

pub fn config_set(api_key: Option<String>, api_url: Option<String>) -> Result<(), CommandError> {
    let engine = idle_engine()?;
    let current = engine.config_store().load()?.settings;
    let updated = apply_updates(current, api_key, api_url)?;
    engine.config_store().save(&updated)?;
    println!("Saved {}", engine.config_path());
    Ok(())
}

fn apply_updates(
    mut settings: Settings,
    api_key: Option<String>,
    api_url: Option<String>,
) -> Result<Settings, CommandError> {
    if api_key.is_none() && api_url.is_none() {
        return Err(CommandError::NothingToSet);
    }
    if let Some(key) = api_key {
        settings.api_key = key;
    }
    if let Some(url) = api_url {
        settings.api_url = url;
    }
    Ok(settings)
}

pub fn configure() -> Result<(), CommandError> {
    let engine = idle_engine()?;
    let ui = TerminalUi::new(io::stdin().lock(), io::stdout());
    engine.open_settings(&ui);
    Ok(())
}
