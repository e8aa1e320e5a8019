// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outbox init` and data directory discovery.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outbox() -> Command {
    cargo_bin_cmd!("outbox")
}

#[test]
fn creates_data_directory() {
    let temp = TempDir::new().unwrap();

    outbox()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized outbox at"))
        .stdout(predicate::str::contains("Remote: none"));

    assert!(temp.path().join(".outbox/config.toml").is_file());
}

#[test]
fn writes_remote_and_scope() {
    let temp = TempDir::new().unwrap();

    outbox()
        .args(["init", "--remote", "ws://localhost:7890", "--scope", "u1"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote: ws://localhost:7890"))
        .stdout(predicate::str::contains("Scope: u1"));

    let config = std::fs::read_to_string(temp.path().join(".outbox/config.toml")).unwrap();
    assert!(config.contains("url = \"ws://localhost:7890\""));
    assert!(config.contains("scope = \"u1\""));
}

#[test]
fn fails_if_already_initialized() {
    let temp = TempDir::new().unwrap();

    outbox().arg("init").current_dir(temp.path()).assert().success();
    outbox()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn rejects_non_websocket_remote() {
    let temp = TempDir::new().unwrap();

    outbox()
        .args(["init", "--remote", "http://localhost:7890"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ws://"));

    assert!(!temp.path().join(".outbox").exists());
}

#[test]
fn commands_require_init() {
    let temp = TempDir::new().unwrap();

    outbox()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("outbox init"));
}

#[test]
fn finds_data_directory_from_subdirectory() {
    let temp = TempDir::new().unwrap();
    outbox().arg("init").current_dir(temp.path()).assert().success();
    let nested = temp.path().join("src/deep");
    std::fs::create_dir_all(&nested).unwrap();

    outbox()
        .args(["enqueue", "note", "insert", r#"{"id":"n1","title":"x"}"#])
        .current_dir(&nested)
        .assert()
        .success();

    outbox()
        .arg("-C")
        .arg(temp.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("insert note n1"));
}
