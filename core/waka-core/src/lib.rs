//! # waka-core
//!
//! Core library for editor activity tracking: turns editor events into
//! heartbeats for the shared `wakatime-cli` helper.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Background dispatch uses plain threads.
//! - **Never fatal**: Missing files, failed downloads and crashed helpers are logged,
//!   never surfaced as host-editor failures.
//! - **Shared files**: The config file and helper install are shared with other
//!   integrations; unknown content is preserved.
//! - **FFI-ready**: UniFFI annotations enable C++, Swift, Kotlin and Python bindings.
//!   Prefer additive public API changes; removing or renaming breaks FFI clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use waka_core::{EditorEvent, WakaEngine};
//!
//! let engine = WakaEngine::new("Shooter".into(), "/work/shooter".into(), "1.0.0".into())?;
//! engine.startup();
//! engine.publish_event(EditorEvent::WorldSaved);
//! ```

// UniFFI scaffolding for C++/Swift/Kotlin/Python bindings
uniffi::setup_scaffolding!();

pub mod config;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod provision;
pub mod router;
pub mod setup;
pub mod storage;
pub mod types;

pub use config::ConfigStore;
pub use engine::WakaEngine;
pub use error::{Result, WakaError, WakaFfiError};
pub use heartbeat::{HeartbeatDispatcher, HelperFiles};
pub use provision::CliProvisioner;
pub use router::{ActivityEventRouter, ActivitySink, EditorEvent, EditorEventKind};
pub use setup::{SaveCallback, SettingsUi, SetupChecker, SetupStatus};
pub use storage::StorageConfig;
pub use types::*;
