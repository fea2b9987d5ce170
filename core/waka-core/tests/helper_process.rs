//! End-to-end heartbeat tests against a shell-script stand-in for the helper.

#![cfg(unix)]

use fs_err as fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use waka_core::{
    ActivityEvent, Category, CliProvisioner, EntityType, RuntimeContext, Settings, StorageConfig,
    WakaEngine,
};

const HELPER: &str = "fake-cli";

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn engine_with_script(temp: &TempDir, body: &str, timeout: Duration) -> WakaEngine {
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    fs::create_dir_all(storage.data_dir()).unwrap();
    write_script(&storage.data_dir().join(HELPER), body);

    let provisioner = CliProvisioner::with_helper_name(storage.clone(), HELPER);
    let context =
        RuntimeContext::new("Arena Shooter", "/work/arena", "1.2.0").with_heartbeat_timeout(timeout);
    WakaEngine::with_parts(storage, context, provisioner)
}

fn blueprint_save() -> ActivityEvent {
    ActivityEvent {
        category: Category::Coding,
        entity_type: EntityType::File,
        entity_path: "/work/arena/Content/BP_Door.uasset".to_string(),
        language: "Blueprints".to_string(),
        is_write: true,
    }
}

#[test]
fn test_nonzero_exit_still_counts_as_sent() {
    let temp = TempDir::new().unwrap();
    let args_file = temp.path().join("args.txt");
    let body = format!(
        "for a in \"$@\"; do printf '%s\\n' \"$a\" >> '{}'; done\nexit 3",
        args_file.display()
    );
    let engine = engine_with_script(&temp, &body, Duration::from_secs(10));
    engine
        .save_settings(Settings {
            api_key: "waka_test".to_string(),
            api_url: "https://example.test/api/v1".to_string(),
        })
        .unwrap();

    let outcome = engine.on_activity(blueprint_save());

    assert!(outcome.success, "outcome: {outcome:?}");
    assert_eq!(outcome.exit_code, 3);

    let recorded = fs::read_to_string(&args_file).unwrap();
    let args: Vec<&str> = recorded.lines().collect();
    let config_path = engine.config_path();
    assert_eq!(args[0], "--config");
    assert_eq!(args[1], config_path.as_str());
    assert_eq!(args[4], "--api-url");
    assert_eq!(args[5], "https://example.test/api/v1");
    assert!(args.windows(2).any(|w| w == ["--project", "Arena Shooter"]));
    assert!(args.windows(2).any(|w| w == ["--plugin", "unreal-wakatime/1.2.0"]));
    assert_eq!(args.last(), Some(&"--write"));
}

#[test]
fn test_hung_helper_is_killed_after_timeout() {
    let temp = TempDir::new().unwrap();
    let engine = engine_with_script(&temp, "sleep 5", Duration::from_millis(200));

    let outcome = engine.on_activity(blueprint_save());

    assert!(!outcome.success);
    assert!(outcome
        .error_detail
        .as_deref()
        .is_some_and(|d| d.contains("timed out")));
}
