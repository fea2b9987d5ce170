//! Heartbeat dispatch: one activity event in, one helper invocation out.
//!
//! ## Lifecycle (per event)
//!
//! ```text
//! Idle → BuildingCommand → Spawning → Completed    → Idle
//!                                   ↘ LaunchFailed ↗
//! ```
//!
//! No retries and no queue. A failed attempt is logged and forgotten; the
//! host editor never sees an error, only a `HeartbeatOutcome`.

use crate::error::WakaError;
use crate::types::{ActivityEvent, HeartbeatOutcome, RuntimeContext, Settings};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Rewrites both `/` and `\` to the host separator.
pub fn normalize_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Paths that every invocation passes through to the helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperFiles {
    pub config_file: PathBuf,
    pub log_file: PathBuf,
}

/// Builds the helper's argument list. Order is fixed and each argument is
/// well-formed on its own, whatever the others contain.
pub fn build_args(
    files: &HelperFiles,
    settings: &Settings,
    event: &ActivityEvent,
    ctx: &RuntimeContext,
) -> Vec<String> {
    let mut args = vec![
        "--config".to_string(),
        files.config_file.to_string_lossy().to_string(),
        "--log-file".to_string(),
        files.log_file.to_string_lossy().to_string(),
    ];

    if !settings.api_url.is_empty() {
        args.push("--api-url".to_string());
        args.push(settings.api_url.clone());
    }

    args.extend([
        "--project".to_string(),
        ctx.project_name.clone(),
        "--project-folder".to_string(),
        normalize_separators(&ctx.project_path),
        "--entity".to_string(),
        normalize_separators(&event.entity_path),
        "--entity-type".to_string(),
        event.entity_type.as_str().to_string(),
        "--language".to_string(),
        event.language.clone(),
        "--plugin".to_string(),
        ctx.plugin_tag(),
        "--category".to_string(),
        event.category.as_str().to_string(),
    ]);

    if event.is_write {
        args.push("--write".to_string());
    }

    args
}

/// Shell-style rendering for logs; arguments with spaces are quoted.
pub fn render_command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.to_string_lossy().to_string())
        .chain(args.iter().cloned())
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
                arg
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the helper for activity events.
#[derive(Debug, Clone)]
pub struct HeartbeatDispatcher {
    files: HelperFiles,
}

impl HeartbeatDispatcher {
    pub fn new(files: HelperFiles) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &HelperFiles {
        &self.files
    }

    /// Sends one heartbeat and waits (bounded by `ctx.heartbeat_timeout`).
    pub fn send_heartbeat(
        &self,
        settings: &Settings,
        helper: &Path,
        event: &ActivityEvent,
        ctx: &RuntimeContext,
    ) -> HeartbeatOutcome {
        let args = build_args(&self.files, settings, event, ctx);
        tracing::debug!(
            command = %render_command_line(helper, &args),
            "Sending heartbeat"
        );

        let outcome = run_helper(helper, &args, ctx.heartbeat_timeout);
        log_outcome(event, &outcome);
        outcome
    }

    /// Sends one heartbeat on a worker thread and returns immediately.
    /// `on_done` receives the outcome once the helper finishes.
    pub fn dispatch<F>(
        &self,
        settings: Settings,
        helper: PathBuf,
        event: ActivityEvent,
        ctx: RuntimeContext,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(HeartbeatOutcome) + Send + 'static,
    {
        let dispatcher = self.clone();
        thread::spawn(move || {
            let outcome = dispatcher.send_heartbeat(&settings, &helper, &event, &ctx);
            on_done(outcome);
        })
    }
}

fn run_helper(helper: &Path, args: &[String], timeout: Duration) -> HeartbeatOutcome {
    let child = Command::new(helper)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| WakaError::Launch {
            program: helper.to_path_buf(),
            source,
        });

    match child {
        Ok(child) => wait_with_timeout(child, timeout),
        Err(err) => HeartbeatOutcome::failed(err.to_string()),
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> HeartbeatOutcome {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return classify_exit(status),
            Ok(None) if started.elapsed() >= timeout => {
                kill_and_reap(&mut child);
                return HeartbeatOutcome::failed(format!(
                    "Helper timed out after {}ms",
                    timeout.as_millis()
                ));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                kill_and_reap(&mut child);
                return HeartbeatOutcome::failed(format!("Failed to wait for helper: {}", err));
            }
        }
    }
}

/// Kills the helper and collects its exit status so no zombie is left.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Any exit code counts as delivered; the helper owns its own semantics.
/// Only a signal-terminated process is treated as a crash.
fn classify_exit(status: ExitStatus) -> HeartbeatOutcome {
    match status.code() {
        Some(code) => HeartbeatOutcome::completed(code),
        None => HeartbeatOutcome::failed(format!("Helper terminated abnormally: {}", status)),
    }
}

fn log_outcome(event: &ActivityEvent, outcome: &HeartbeatOutcome) {
    if outcome.success {
        tracing::info!(
            category = %event.category,
            entity_type = %event.entity_type,
            exit_code = outcome.exit_code,
            "Heartbeat sent"
        );
    } else {
        tracing::error!(
            category = %event.category,
            error = outcome.error_detail.as_deref().unwrap_or("unknown"),
            "Heartbeat couldn't be sent"
        );
    }
}
