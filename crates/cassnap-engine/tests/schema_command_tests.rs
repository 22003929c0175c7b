#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cassnap_core::{AssumeYes, ExErrorKind, ScopeRequest};
use cassnap_engine::commands::schema::{load_schema, save_schema};
use common::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_saved_schema_replays_on_empty_node() {
    let temp = TempDir::new().unwrap();
    let source = populated(&temp);
    let dest = temp.path().join("schema-out");

    let saved = save_schema(
        &context(&source, &AssumeYes),
        &ScopeRequest::from_raw(&["audit".to_string()], &[]).unwrap(),
        &dest,
        &temp.path().join("staging"),
        true,
    )
    .unwrap();

    assert_eq!(saved.keyspaces, vec![ks("audit")]);
    assert!(dest.join("schema.cql").is_file());
    assert!(dest.join("schemas.zip").is_file());
    assert!(dest.join("ring_info.txt").is_file());
    assert!(!temp.path().join("staging").exists());

    let other = TempDir::new().unwrap();
    let target = FakeNode::new(&other.path().join("data"));
    let files = load_schema(&context(&target, &AssumeYes), &dest, &[ks("audit")]).unwrap();

    assert_eq!(files, 1);
    assert_eq!(target.user_keyspaces(), vec!["audit"]);
    assert_eq!(target.tables("audit"), vec!["events"]);

    // A second replay collides with the schema it created
    let err = load_schema(&context(&target, &AssumeYes), &dest, &[ks("audit")]).unwrap_err();
    assert!(err.message().contains("already exists"), "{}", err.message());
}

#[test]
fn test_repeated_keyspace_replays_once() {
    let temp = TempDir::new().unwrap();
    let source = populated(&temp);
    let dest = temp.path().join("schema-out");
    save_schema(
        &context(&source, &AssumeYes),
        &ScopeRequest::from_raw(&["app".to_string()], &[]).unwrap(),
        &dest,
        &temp.path().join("staging"),
        false,
    )
    .unwrap();

    let other = TempDir::new().unwrap();
    let target = FakeNode::new(&other.path().join("data"));
    let files = load_schema(&context(&target, &AssumeYes), &dest, &[ks("app"), ks("app")]).unwrap();

    assert_eq!(files, 1);
    assert_eq!(target.queries_starting_with("CREATE KEYSPACE app").len(), 1);
    assert_eq!(target.tables("app"), vec!["t1", "t2"]);
}

#[test]
fn test_save_rejects_unknown_keyspace() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let dest = temp.path().join("schema-out");

    let err = save_schema(
        &context(&node, &AssumeYes),
        &ScopeRequest::from_raw(&["ghost".to_string()], &[]).unwrap(),
        &dest,
        &temp.path().join("staging"),
        false,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert!(!dest.exists());
}

#[test]
fn test_load_requires_keyspace_file() {
    let temp = TempDir::new().unwrap();
    let node = FakeNode::new(&temp.path().join("data"));
    let dest = temp.path().join("schema-in");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("schema.cql"), "CREATE KEYSPACE app WITH replication = {};").unwrap();

    let err = load_schema(&context(&node, &AssumeYes), &dest, &[ks("app")]).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert!(node.user_keyspaces().is_empty());

    // Unscoped falls back to schema.cql
    assert_eq!(load_schema(&context(&node, &AssumeYes), &dest, &[]).unwrap(), 1);
    assert_eq!(node.user_keyspaces(), vec!["app"]);
}
