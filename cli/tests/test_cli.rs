//! Integration tests for the `atrium` binary that need no platform.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: [&str; 5] = [
    "ATRIUM_URL",
    "ATRIUM_ANON_KEY",
    "ATRIUM_SERVICE_KEY",
    "ATRIUM_EMAIL",
    "ATRIUM_PASSWORD",
];

/// CLI command isolated from the caller's environment and config.
fn atrium(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_atrium"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", dir.path())
        .arg("--no-color")
        .arg("--config")
        .arg(dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    atrium(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("provision-bucket"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("whoami"));
}

#[test]
fn test_version_includes_commit() {
    let dir = TempDir::new().unwrap();
    atrium(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commit:"));
}

#[test]
fn test_missing_url_is_fatal() {
    let dir = TempDir::new().unwrap();
    atrium(&dir)
        .arg("check")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ATRIUM_URL is not set"));
}

#[test]
fn test_missing_anon_key_is_fatal() {
    let dir = TempDir::new().unwrap();
    atrium(&dir)
        .env("ATRIUM_URL", "http://127.0.0.1:9")
        .arg("check")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ATRIUM_ANON_KEY is not set"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "[logging]\nlevel = \"chatty\"\n").unwrap();
    atrium(&dir)
        .env("ATRIUM_URL", "http://127.0.0.1:9")
        .env("ATRIUM_ANON_KEY", "anon")
        .arg("check")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("logging.level"));
}

#[test]
fn test_provision_requires_service_key() {
    let dir = TempDir::new().unwrap();
    atrium(&dir)
        .env("ATRIUM_URL", "http://127.0.0.1:9")
        .env("ATRIUM_ANON_KEY", "anon")
        .arg("provision-bucket")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ATRIUM_SERVICE_KEY"));
}

#[test]
fn test_config_url_used_when_env_unset() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[server]\nurl = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();
    // URL comes from the file, so the anon key is what's missing.
    atrium(&dir)
        .arg("check")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ATRIUM_ANON_KEY is not set"));
}
