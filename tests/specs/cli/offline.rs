// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for offline use: writes land locally and survive until a remote
//! is reachable.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use yare::parameterized;

fn outbox() -> Command {
    cargo_bin_cmd!("outbox")
}

fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    outbox().arg("init").current_dir(temp.path()).assert().success();
    temp
}

/// A `ws://` URL nobody listens on.
fn dead_remote() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}")
}

fn init_temp_with_dead_remote() -> TempDir {
    let temp = TempDir::new().unwrap();
    outbox()
        .args(["init", "--remote", &dead_remote()])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

fn enqueue(temp: &TempDir, entity: &str, op: &str, json: &str) {
    outbox()
        .args(["enqueue", entity, op, json])
        .current_dir(temp.path())
        .assert()
        .success();
}

#[test]
fn enqueue_is_visible_immediately() {
    let temp = init_temp();

    enqueue(&temp, "task", "insert", r#"{"id":"t1","title":"Buy milk","done":false}"#);

    outbox()
        .args(["read", "task"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("t1  done=false title=Buy milk"));
}

#[test]
fn update_merges_into_cached_record() {
    let temp = init_temp();
    enqueue(&temp, "task", "insert", r#"{"id":"t1","title":"Buy milk"}"#);
    enqueue(&temp, "task", "update", r#"{"id":"t1","done":true}"#);

    let output = outbox()
        .args(["read", "task", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(records, serde_json::json!([{"id": "t1", "title": "Buy milk", "done": true}]));
}

#[test]
fn delete_removes_cached_record() {
    let temp = init_temp();
    enqueue(&temp, "contact", "insert", r#"{"id":"c1","name":"Ada"}"#);
    enqueue(&temp, "contact", "delete", r#"{"id":"c1"}"#);

    outbox()
        .args(["read", "contacts"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no contact records cached"));
}

#[test]
fn pending_lists_in_order() {
    let temp = init_temp();
    enqueue(&temp, "note", "insert", r#"{"id":"n1","title":"a"}"#);
    enqueue(&temp, "task", "insert", r#"{"id":"t1","title":"b"}"#);

    let output = outbox()
        .arg("pending")
        .current_dir(temp.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("insert note n1"));
    assert!(lines[1].ends_with("insert task t1"));
}

#[parameterized(
    not_json = { "{id: n1}", "invalid JSON" },
    missing_id = { r#"{"title":"x"}"#, "\"id\"" },
    not_object = { "[1]", "JSON object" },
)]
fn enqueue_rejects_bad_payloads(json: &str, message: &str) {
    let temp = init_temp();

    outbox()
        .args(["enqueue", "note", "insert", json])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(message));

    outbox()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .stdout(predicate::str::contains("nothing pending"));
}

#[test]
fn sync_without_remote_keeps_changes() {
    let temp = init_temp();
    enqueue(&temp, "note", "insert", r#"{"id":"n1","title":"a"}"#);

    outbox()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("offline, 1 changes saved locally"));

    outbox()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 1"));
}

#[test]
fn sync_with_unreachable_remote_keeps_changes() {
    let temp = init_temp_with_dead_remote();
    enqueue(&temp, "note", "insert", r#"{"id":"n1","title":"a"}"#);
    enqueue(&temp, "note", "update", r#"{"id":"n1","title":"b"}"#);

    outbox()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("offline, 2 changes saved locally"));

    outbox()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("retried").not());
}

#[test]
fn fetch_with_unreachable_remote_fails() {
    let temp = init_temp_with_dead_remote();

    outbox()
        .arg("fetch")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("offline"));
}

#[test]
fn fetch_without_remote_fails() {
    let temp = init_temp();

    outbox()
        .arg("fetch")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remote configured"));
}

#[test]
fn status_reports_cache_counts() {
    let temp = init_temp();
    enqueue(&temp, "note", "insert", r#"{"id":"n1","title":"a"}"#);
    enqueue(&temp, "note", "insert", r#"{"id":"n2","title":"b"}"#);

    outbox()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("remote: none"))
        .stdout(predicate::str::contains("cached: 2 note, 0 task, 0 contact"))
        .stdout(predicate::str::contains("last synced: never"));
}
