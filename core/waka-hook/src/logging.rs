//! File logging for waka-hook.
//!
//! Logs go to a daily-rotated `waka-hook.log` beside the helper's own log in
//! the data dir. stdout stays clean for `status --json` and friends.

use fs_err as fs;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use waka_core::StorageConfig;

const LOG_FILE_PREFIX: &str = "waka-hook.log";
const DEBUG_ENV: &str = "WAKA_HOOK_DEBUG";

/// Installs the global subscriber. The returned guard must live until exit
/// or buffered lines are lost. `None` means logging is off (no home dir,
/// unwritable data dir, or a subscriber was already set).
pub fn init() -> Option<WorkerGuard> {
    let dir = StorageConfig::from_env().ok()?.data_dir();
    fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter(env::var(DEBUG_ENV).ok().as_deref()))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn filter(debug_flag: Option<&str>) -> EnvFilter {
    if debug_requested(debug_flag) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_requested(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}
