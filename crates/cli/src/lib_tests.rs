// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

//! Tests for argument parsing and the public `run()` entry point.

use clap::Parser;
use outbox_core::{EntityType, Operation};
use tempfile::TempDir;
use yare::parameterized;

use crate::{run, Cli, Command, Error, OutputFormat};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("outbox").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_parse_init_with_remote() {
    let cli = parse(&["init", "--remote", "ws://localhost:7890", "--scope", "u1"]);
    let Command::Init { remote, scope } = cli.command else {
        panic!("expected init");
    };
    assert_eq!(remote.as_deref(), Some("ws://localhost:7890"));
    assert_eq!(scope.as_deref(), Some("u1"));
}

#[parameterized(
    note_insert = { "note", "insert", EntityType::Note, Operation::Insert },
    tasks_update = { "tasks", "update", EntityType::Task, Operation::Update },
    contact_delete = { "contact", "delete", EntityType::Contact, Operation::Delete },
)]
fn test_parse_enqueue(entity_arg: &str, op_arg: &str, entity_type: EntityType, op: Operation) {
    let cli = parse(&["enqueue", entity_arg, op_arg, r#"{"id":"x"}"#]);
    let Command::Enqueue {
        entity,
        operation,
        json,
    } = cli.command
    else {
        panic!("expected enqueue");
    };
    assert_eq!(entity, entity_type);
    assert_eq!(operation, op);
    assert_eq!(json, r#"{"id":"x"}"#);
}

#[parameterized(
    unknown_entity = { &["enqueue", "widget", "insert", "{}"] },
    unknown_operation = { &["enqueue", "note", "upsert", "{}"] },
    missing_json = { &["enqueue", "note", "insert"] },
    unknown_format = { &["read", "note", "-o", "yaml"] },
)]
fn test_parse_rejects(args: &[&str]) {
    let argv = std::iter::once("outbox").chain(args.iter().copied());
    assert!(Cli::try_parse_from(argv).is_err());
}

#[test]
fn test_parse_read_json_output() {
    let cli = parse(&["read", "notes", "-o", "json"]);
    let Command::Read { entity, output } = cli.command else {
        panic!("expected read");
    };
    assert_eq!(entity, EntityType::Note);
    assert_eq!(output, OutputFormat::Json);
}

#[test]
fn test_parse_fetch_entities_default_empty() {
    let cli = parse(&["fetch"]);
    let Command::Fetch { scope, entities } = cli.command else {
        panic!("expected fetch");
    };
    assert!(scope.is_none());
    assert!(entities.is_empty());

    let cli = parse(&["fetch", "--scope", "u2", "task", "contact"]);
    let Command::Fetch { scope, entities } = cli.command else {
        panic!("expected fetch");
    };
    assert_eq!(scope.as_deref(), Some("u2"));
    assert_eq!(entities, vec![EntityType::Task, EntityType::Contact]);
}

#[test]
fn test_parse_global_directory_flag() {
    let cli = parse(&["status", "-C", "/tmp/project"]);
    assert_eq!(cli.directory.as_deref(), Some("/tmp/project"));
    assert!(matches!(cli.command, Command::Status));
}

#[test]
fn test_run_in_uninitialized_directory() {
    let dir = TempDir::new().unwrap();
    let cli = parse(&["-C", dir.path().to_str().unwrap(), "pending"]);
    assert!(matches!(run(cli), Err(Error::NotInitialized)));
}

#[test]
fn test_run_init_then_enqueue() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();

    run(parse(&["-C", path, "init"])).unwrap();
    run(parse(&["-C", path, "enqueue", "note", "insert", r#"{"id":"n1"}"#])).unwrap();
    run(parse(&["-C", path, "pending"])).unwrap();

    assert!(dir.path().join(".outbox").is_dir());
}
