//! Integration tests for helper provisioning against a local HTTP server.

use std::io::{Cursor, Write};
use tempfile::TempDir;
use waka_core::{CliProvisioner, StorageConfig, WakaError};
use zip::write::SimpleFileOptions;

const HELPER: &str = "wakatime-cli-test-amd64";

fn release_zip(entry: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(entry, SimpleFileOptions::default().unix_permissions(0o755))
        .unwrap();
    writer.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    writer.finish().unwrap().into_inner()
}

fn setup() -> (TempDir, StorageConfig, CliProvisioner) {
    let temp = TempDir::new().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let provisioner = CliProvisioner::with_helper_name(storage.clone(), HELPER);
    (temp, storage, provisioner)
}

#[test]
fn test_download_and_extract_installs_helper() {
    let (_temp, storage, provisioner) = setup();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/cli.zip")
        .with_status(200)
        .with_body(release_zip(HELPER))
        .expect(1)
        .create();
    let url = format!("{}/cli.zip", server.url());

    let path = provisioner
        .ensure_installed(&storage.managed_install_dir(), &url)
        .unwrap();

    mock.assert();
    assert_eq!(path, storage.managed_install_dir().join(HELPER));
    assert!(path.is_file());
    assert!(storage.archive_file().is_file());
    assert!(provisioner.installation().installed);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[test]
fn test_second_call_makes_no_request() {
    let (_temp, storage, provisioner) = setup();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/cli.zip")
        .with_status(200)
        .with_body(release_zip(HELPER))
        .expect(1)
        .create();
    let url = format!("{}/cli.zip", server.url());
    let install_dir = storage.managed_install_dir();

    let first = provisioner.ensure_installed(&install_dir, &url).unwrap();
    let second = provisioner.ensure_installed(&install_dir, &url).unwrap();

    assert_eq!(first, second);
    mock.assert();
}

#[test]
fn test_http_error_leaves_nothing_behind() {
    let (_temp, storage, provisioner) = setup();
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/cli.zip").with_status(404).create();
    let url = format!("{}/cli.zip", server.url());

    let err = provisioner
        .ensure_installed(&storage.managed_install_dir(), &url)
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, WakaError::Download { .. }), "got {err:?}");
    assert!(!storage.archive_file().exists());
    assert!(!storage.managed_install_dir().join(HELPER).exists());
}

#[test]
fn test_corrupt_archive_is_kept_for_inspection() {
    let (_temp, storage, provisioner) = setup();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/cli.zip")
        .with_status(200)
        .with_body("this is not a zip archive")
        .create();
    let url = format!("{}/cli.zip", server.url());

    let err = provisioner
        .ensure_installed(&storage.managed_install_dir(), &url)
        .unwrap_err();

    assert!(matches!(err, WakaError::Extract { .. }), "got {err:?}");
    assert!(storage.archive_file().is_file());
    assert!(!provisioner.installation().installed);
}

#[test]
fn test_archive_without_helper_is_extract_error() {
    let (_temp, storage, provisioner) = setup();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/cli.zip")
        .with_status(200)
        .with_body(release_zip("README.md"))
        .create();
    let url = format!("{}/cli.zip", server.url());

    let err = provisioner
        .ensure_installed(&storage.managed_install_dir(), &url)
        .unwrap_err();

    match err {
        WakaError::Extract { details, .. } => assert!(details.contains(HELPER)),
        other => panic!("expected extract error, got {other:?}"),
    }
}
