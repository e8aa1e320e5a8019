// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    note = { "note", EntityType::Note },
    plural = { "tasks", EntityType::Task },
    upper = { "CONTACT", EntityType::Contact },
)]
fn entity_type_parse(input: &str, expected: EntityType) {
    assert_eq!(input.parse::<EntityType>().unwrap(), expected);
}

#[test]
fn entity_type_parse_unknown() {
    let err = "invoice".parse::<EntityType>().unwrap_err();
    assert!(matches!(err, Error::InvalidEntityType(ref s) if s == "invoice"));
}

#[test]
fn entity_type_display_matches_serde_tag() {
    for entity_type in EntityType::ALL {
        let tag = serde_json::to_value(entity_type).unwrap();
        assert_eq!(tag, json!(entity_type.as_str()));
    }
}

#[parameterized(
    insert = { "insert", Operation::Insert },
    update = { "Update", Operation::Update },
    delete = { "delete", Operation::Delete },
)]
fn operation_parse(input: &str, expected: Operation) {
    assert_eq!(input.parse::<Operation>().unwrap(), expected);
}

#[test]
fn operation_parse_unknown() {
    assert!("upsert".parse::<Operation>().is_err());
}

#[test]
fn entity_id_requires_non_empty_string() {
    let with_id = json!({"id": "n1"});
    let empty_id = json!({"id": ""});
    let numeric_id = json!({"id": 7});

    assert_eq!(entity_id(with_id.as_object().unwrap()), Some("n1"));
    assert_eq!(entity_id(empty_id.as_object().unwrap()), None);
    assert_eq!(entity_id(numeric_id.as_object().unwrap()), None);
}

#[test]
fn payload_from_value_rejects_non_object() {
    let err = payload_from_value(EntityType::Note, Operation::Insert, json!(["n1"])).unwrap_err();
    assert!(matches!(err, Error::InvalidPayload(_)));
}

#[parameterized(
    insert = { Operation::Insert },
    update = { Operation::Update },
    delete = { Operation::Delete },
)]
fn payload_from_value_requires_id(operation: Operation) {
    let err = payload_from_value(EntityType::Task, operation, json!({"title": "x"})).unwrap_err();
    assert!(matches!(err, Error::MissingEntityId { .. }));
}

#[test]
fn payload_from_value_accepts_object_with_id() {
    let record =
        payload_from_value(EntityType::Note, Operation::Insert, json!({"id": "n1", "text": "x"}))
            .unwrap();
    assert_eq!(record.get("text"), Some(&json!("x")));
}
