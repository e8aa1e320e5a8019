// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outbox reset`.

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

fn init_with_note() -> TempDir {
    let temp = TempDir::new().unwrap();
    outbox().arg("init").current_dir(temp.path()).assert().success();
    outbox()
        .args(["enqueue", "note", "insert", r#"{"id":"n1","title":"a"}"#])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

fn assert_pending(temp: &TempDir, count: usize) {
    outbox()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("pending: {count}")));
}

fn assert_cached_notes(temp: &TempDir, count: usize) {
    outbox()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("cached: {count} note")));
}

#[test]
fn reset_clears_everything_by_default() {
    let temp = init_with_note();

    outbox()
        .arg("reset")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared queue (1 pending changes dropped)"))
        .stdout(predicate::str::contains("cleared cache"));

    assert_pending(&temp, 0);
    assert_cached_notes(&temp, 0);
}

#[test]
fn reset_queue_keeps_cache() {
    let temp = init_with_note();

    outbox()
        .args(["reset", "--queue"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared cache").not());

    assert_pending(&temp, 0);
    assert_cached_notes(&temp, 1);
}

#[test]
fn reset_cache_keeps_queue() {
    let temp = init_with_note();

    outbox()
        .args(["reset", "--cache"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared queue").not());

    assert_pending(&temp, 1);
    assert_cached_notes(&temp, 0);
}

#[test]
fn reset_requires_init() {
    let temp = TempDir::new().unwrap();

    outbox()
        .arg("reset")
        .current_dir(temp.path())
        .assert()
        .failure();
}
