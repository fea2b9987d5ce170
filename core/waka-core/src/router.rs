//! Editor-facing event router.
//!
//! The host editor translates its own delegates into [`EditorEvent`]s and
//! publishes them here. The router turns each one into at most one
//! [`ActivityEvent`] and hands it to an [`ActivitySink`] (normally the
//! engine, which dispatches a heartbeat in the background).
//!
//! ## Mapping
//!
//! ```text
//! ActorsDropped/Duplicated/Deleted, LevelAdded → designing, app, read
//! WorldSaved                                   → designing, app, write
//! PlayStarted                                  → debugging, app, read
//! PlayEnded                                    → debugging, app, write
//! BlueprintCompiled (open in an editor only)   → coding, file, write
//! AssetOpened/AssetClosed                      → blueprint tracking only
//! ```

use crate::types::{ActivityEvent, Category, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// Entity and language reported for editor-wide (non-file) activity.
pub const EDITOR_APP_ENTITY: &str = "Unreal Editor";
pub const BLUEPRINT_LANGUAGE: &str = "Blueprints";

/// Editor notifications the router understands. Hosts send these over FFI
/// or as one JSON object per line (`{"event":"world_saved"}`) to the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    ActorsDropped,
    ActorsDuplicated,
    ActorsDeleted,
    LevelAdded,
    WorldSaved,
    PlayStarted,
    PlayEnded,
    BlueprintCompiled { name: String, file_path: String },
    AssetOpened { name: String, is_blueprint: bool },
    AssetClosed { name: String, is_blueprint: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEventKind {
    ActorsDropped,
    ActorsDuplicated,
    ActorsDeleted,
    LevelAdded,
    WorldSaved,
    PlayStarted,
    PlayEnded,
    BlueprintCompiled,
    AssetOpened,
    AssetClosed,
}

impl EditorEvent {
    pub fn kind(&self) -> EditorEventKind {
        match self {
            Self::ActorsDropped => EditorEventKind::ActorsDropped,
            Self::ActorsDuplicated => EditorEventKind::ActorsDuplicated,
            Self::ActorsDeleted => EditorEventKind::ActorsDeleted,
            Self::LevelAdded => EditorEventKind::LevelAdded,
            Self::WorldSaved => EditorEventKind::WorldSaved,
            Self::PlayStarted => EditorEventKind::PlayStarted,
            Self::PlayEnded => EditorEventKind::PlayEnded,
            Self::BlueprintCompiled { .. } => EditorEventKind::BlueprintCompiled,
            Self::AssetOpened { .. } => EditorEventKind::AssetOpened,
            Self::AssetClosed { .. } => EditorEventKind::AssetClosed,
        }
    }
}

fn editor_activity(category: Category, is_write: bool) -> ActivityEvent {
    ActivityEvent {
        category,
        entity_type: EntityType::App,
        entity_path: EDITOR_APP_ENTITY.to_string(),
        language: EDITOR_APP_ENTITY.to_string(),
        is_write,
    }
}

/// Receives activity produced by the router.
pub trait ActivitySink: Send + Sync {
    fn on_activity(&self, event: ActivityEvent);
}

impl<F> ActivitySink for F
where
    F: Fn(ActivityEvent) + Send + Sync,
{
    fn on_activity(&self, event: ActivityEvent) {
        self(event)
    }
}

pub type EventHandler = Box<dyn Fn(&EditorEvent) + Send + Sync>;

/// Maps editor events to activity and fans them out to subscribers.
pub struct ActivityEventRouter {
    sink: Arc<dyn ActivitySink>,
    handlers: RwLock<HashMap<EditorEventKind, Vec<EventHandler>>>,
    open_blueprints: Mutex<HashSet<String>>,
}

impl ActivityEventRouter {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            sink,
            handlers: RwLock::new(HashMap::new()),
            open_blueprints: Mutex::new(HashSet::new()),
        }
    }

    /// Registers an extra listener for one event kind. Listeners run before
    /// the event is routed to the sink.
    pub fn subscribe<F>(&self, kind: EditorEventKind, handler: F)
    where
        F: Fn(&EditorEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Entry point for the host: notify listeners, then report activity.
    /// Returns the activity that was forwarded, if any.
    pub fn publish(&self, event: &EditorEvent) -> Option<ActivityEvent> {
        if let Some(handlers) = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event.kind())
        {
            for handler in handlers {
                handler(event);
            }
        }

        let activity = self.route(event)?;
        self.sink.on_activity(activity.clone());
        Some(activity)
    }

    /// Settings were edited elsewhere. Nothing is cached, so this only logs.
    pub fn config_changed(&self) {
        tracing::debug!("Config change notified; next heartbeat re-reads settings");
    }

    pub fn is_blueprint_open(&self, name: &str) -> bool {
        self.open_blueprints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name)
    }

    fn route(&self, event: &EditorEvent) -> Option<ActivityEvent> {
        match event {
            EditorEvent::ActorsDropped
            | EditorEvent::ActorsDuplicated
            | EditorEvent::ActorsDeleted
            | EditorEvent::LevelAdded => Some(editor_activity(Category::Designing, false)),
            EditorEvent::WorldSaved => Some(editor_activity(Category::Designing, true)),
            EditorEvent::PlayStarted => Some(editor_activity(Category::Debugging, false)),
            EditorEvent::PlayEnded => Some(editor_activity(Category::Debugging, true)),
            EditorEvent::BlueprintCompiled { name, file_path } => {
                if !self.is_blueprint_open(name) {
                    tracing::debug!(blueprint = %name, "Ignoring compile of blueprint not open in an editor");
                    return None;
                }
                Some(ActivityEvent {
                    category: Category::Coding,
                    entity_type: EntityType::File,
                    entity_path: file_path.clone(),
                    language: BLUEPRINT_LANGUAGE.to_string(),
                    is_write: true,
                })
            }
            EditorEvent::AssetOpened { name, is_blueprint } => {
                if *is_blueprint {
                    self.open_blueprints
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(name.clone());
                }
                None
            }
            EditorEvent::AssetClosed { name, is_blueprint } => {
                if *is_blueprint {
                    self.open_blueprints
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .remove(name);
                }
                None
            }
        }
    }
}
