// Command-line behaviour that does not touch the managed services

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn relink() -> Command {
    let mut cmd = Command::cargo_bin("relink").unwrap();
    // Keep the developer's environment out of the tests
    for var in [
        "RELINK_REMOTE_HOST",
        "RELINK_REMOTE_USER",
        "RELINK_BARRIER_PORT",
        "RELINK_BIND_ADDRESS",
        "RELINK_PORT",
        "RELINK_OPEN_BROWSER",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_version_flag() {
    relink()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("relink v"));
}

#[test]
fn test_build_info_flag() {
    relink()
        .arg("--build-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Target:"));
}

#[test]
fn test_help_lists_subcommands() {
    relink()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("tui"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("reconnect"));
}

#[test]
fn test_reconnect_unknown_service() {
    let dir = tempdir().unwrap();
    relink()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .args(["reconnect", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown service 'nonexistent'"));
}

#[test]
fn test_invalid_env_override_is_reported() {
    let dir = tempdir().unwrap();
    relink()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .env("RELINK_BARRIER_PORT", "not-a-port")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("RELINK_BARRIER_PORT"));
}

#[test]
fn test_non_loopback_bind_is_refused() {
    let dir = tempdir().unwrap();
    relink()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .env("RELINK_BIND_ADDRESS", "0.0.0.0")
        .args(["serve", "--no-browser"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loopback"));
}

#[test]
fn test_malformed_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "barrier_port: [not, a, number]\n").unwrap();

    relink()
        .arg("--config")
        .arg(&path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
