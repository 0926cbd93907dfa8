//! CLI integration tests
//!
//! Tests the burrow CLI using assert_cmd. Each test points the config
//! directory at a scratch location so a developer's own config is never
//! read.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn burrow(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("burrow")
        .expect("Failed to locate burrow binary - ensure it's built before running tests");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("BURROW_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("burrow"))
        .stdout(predicate::str::contains("SSH relay"));
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("burrow"));
}

#[test]
fn test_cli_serve_help() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--subdomain"))
        .stdout(predicate::str::contains("--identity"));
}

#[test]
fn test_cli_config_path_respects_flag() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    burrow(&home)
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_cli_config_show_without_file() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("relay_domain"));
}

#[test]
fn test_cli_config_init_and_show() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("burrow.toml");

    burrow(&home)
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    burrow(&home)
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[tunnel]"));
}

#[test]
fn test_cli_config_init_refuses_existing_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("burrow.toml");
    std::fs::write(&path, "[tunnel]\nsubdomain = \"keep\"\n").unwrap();

    burrow(&home)
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    burrow(&home)
        .args(["config", "init", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_cli_serve_rejects_bad_retry_config() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("burrow.toml");
    std::fs::write(&path, "[retry]\nmultiplier = -1.0\nmax_attempts = 3\n").unwrap();

    burrow(&home)
        .args(["serve", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.multiplier"));
}

#[test]
fn test_cli_serve_missing_identity() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("no-such-key");

    burrow(&home)
        .args(["serve", "--identity"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to establish tunnel"))
        .stderr(predicate::str::contains("no-such-key"));
}

#[test]
fn test_cli_serve_missing_config_file() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["serve", "--config"])
        .arg(home.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_cli_unknown_command() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
