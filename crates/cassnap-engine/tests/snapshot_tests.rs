#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cassnap_core::prompt::{ScriptedAnswer, ScriptedPrompt};
use cassnap_core::{ArchiveManifest, AssumeYes, ExErrorKind, ScopeRequest};
use cassnap_engine::commands::snapshot::{snapshot, upload_archive, SnapshotRequest, UploadOutcome};
use cassnap_store::{DirectoryObjectStore, RemoteStore};
use common::*;
use std::fs;
use tempfile::TempDir;

fn request(temp: &TempDir, keyspaces: &[&str], tables: &[&str], title: &str) -> SnapshotRequest {
    SnapshotRequest {
        scope: ScopeRequest::from_raw(
            &keyspaces.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            &tables.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .unwrap(),
        title: Some(title.to_string()),
        destination: temp.path().join("archives"),
        overwrite: false,
        include_ring: false,
    }
}

#[test]
fn test_keyspace_scoped_archive_contains_only_that_keyspace() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let outcome = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &["app"], &[], "nightly")).unwrap();

    assert_eq!(outcome.archive, temp.path().join("archives/nightly.zip"));
    assert_eq!(
        zip_members(&outcome.archive),
        vec![
            "app/t1/nb-1-big-Data.db",
            "app/t2/nb-1-big-Data.db",
            "manifest.json",
            "schema.cql",
            "schemas.zip",
        ]
    );

    let ddl = zip_text(&outcome.archive, "schema.cql");
    assert!(ddl.contains("CREATE TABLE app.t1"));
    assert!(ddl.contains("CREATE TABLE app.t2"));
    assert!(!ddl.contains("audit"));

    let nested = temp.path().join("schemas.zip");
    {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(fs::File::open(&outcome.archive).unwrap()).unwrap();
        let mut bytes = Vec::new();
        archive.by_name("schemas.zip").unwrap().read_to_end(&mut bytes).unwrap();
        fs::write(&nested, bytes).unwrap();
    }
    assert_eq!(zip_members(&nested), vec!["app/app_schema.cql"]);

    assert!(!temp.path().join("scratch").exists(), "workspace discarded");
    assert!(!temp.path().join("archives/.nightly.zip.partial").exists());
}

#[test]
fn test_manifest_records_scope_and_digests() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let outcome = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &[], &[], "full")).unwrap();

    let manifest = manifest_from(&zip_text(&outcome.archive, "manifest.json"));
    assert_eq!(manifest.title, "full");
    assert_eq!(manifest.origin_host, HOST);
    assert_eq!(manifest.tables["app"], vec!["t1", "t2"]);
    assert_eq!(manifest.tables["audit"], vec!["events"]);
    assert!(!manifest.tables.contains_key("system"));
    assert!(manifest.file_sha256.contains_key("schema.cql"));
    assert!(manifest.file_sha256.contains_key("audit/events/nb-1-big-Data.db"));
    assert!(!manifest.file_sha256.contains_key("manifest.json"));
    assert_eq!(outcome.manifest, manifest);

    // Unscoped archives carry the whole described schema
    let ddl = zip_text(&outcome.archive, "schema.cql");
    assert!(ddl.contains("CREATE TABLE audit.events"));
}

fn manifest_from(text: &str) -> ArchiveManifest {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("manifest.json"), text).unwrap();
    cassnap_store::archive::read_manifest(temp.path()).unwrap().unwrap()
}

#[test]
fn test_unknown_keyspace_has_no_side_effects() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let err = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &["ghost"], &[], "x")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert_eq!(err.subject(), Some("ghost"));
    assert_eq!(node.clear_calls.get(), 0);
    assert!(node.snapshot_calls.borrow().is_empty());
    assert!(!temp.path().join("scratch").exists());
    assert!(!temp.path().join("archives").exists());
}

fn is_empty_or_absent(dir: &std::path::Path) -> bool {
    !dir.exists() || fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn test_failure_after_snapshot_leaves_no_archive_or_partial() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    *node.fail_on.borrow_mut() = Some("DESCRIBE KEYSPACE \"app\"".to_string());
    let ctx = context(&node, &AssumeYes);

    let err = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &["app"], &[], "nightly")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Internal);
    assert_eq!(node.snapshot_calls.borrow().len(), 1, "failed after the node snapshot");
    assert!(is_empty_or_absent(&temp.path().join("archives")));
    assert!(is_empty_or_absent(&temp.path().join("scratch")));
}

#[test]
fn test_repeated_table_is_snapshotted_once() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);
    let mut req = request(&temp, &["app"], &["t1"], "nightly");
    req.scope.tables = vec![tb("t1"), tb("t1")];

    let outcome = snapshot(&ctx, &temp.path().join("scratch"), &req).unwrap();

    assert_eq!(node.snapshot_calls.borrow().len(), 1);
    assert_eq!(outcome.manifest.tables["app"], vec!["t1"]);
}

#[test]
fn test_table_filter_with_two_keyspaces_rejected_before_any_query() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let err = snapshot(
        &ctx,
        &temp.path().join("scratch"),
        &request(&temp, &["app", "audit"], &["t1"], "x"),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert!(node.queries.borrow().is_empty());
    assert!(node.snapshot_calls.borrow().is_empty());
}

#[test]
fn test_second_build_with_same_title_collides() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);
    let scratch = temp.path().join("scratch");

    let first = snapshot(&ctx, &scratch, &request(&temp, &[], &[], "nightly")).unwrap();
    let before = fs::read(&first.archive).unwrap();
    node.create_table("app", "t3");

    let err = snapshot(&ctx, &scratch, &request(&temp, &[], &[], "nightly")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Collision);
    assert_eq!(fs::read(&first.archive).unwrap(), before);
    assert_eq!(node.snapshot_calls.borrow().len(), 1);
}

#[test]
fn test_overwrite_replaces_existing_archive() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);
    let scratch = temp.path().join("scratch");

    let first = snapshot(&ctx, &scratch, &request(&temp, &["app"], &[], "nightly")).unwrap();
    node.create_table("app", "t3");

    let mut again = request(&temp, &["app"], &[], "nightly");
    again.overwrite = true;
    snapshot(&ctx, &scratch, &again).unwrap();

    assert!(zip_members(&first.archive).contains(&"app/t3/nb-1-big-Data.db".to_string()));
}

#[test]
fn test_table_subset_snapshots_each_table() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let outcome = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &["app"], &["t2"], "sub")).unwrap();

    assert_eq!(
        *node.snapshot_calls.borrow(),
        vec![("sub".to_string(), vec!["app".to_string()], Some("t2".to_string()))]
    );
    assert_eq!(node.clear_calls.get(), 1);
    assert_eq!(outcome.manifest.tables["app"], vec!["t2"]);
    let members = zip_members(&outcome.archive);
    assert!(members.contains(&"app/t2/nb-1-big-Data.db".to_string()));
    assert!(!members.iter().any(|m| m.starts_with("app/t1/")));
}

#[test]
fn test_unreachable_host_is_connectivity_error() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    node.reachable.set(false);
    let ctx = context(&node, &AssumeYes);

    let err = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &[], &[], "x")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Connectivity);
    assert_eq!(err.subject(), Some(HOST));
    assert!(node.snapshot_calls.borrow().is_empty());
}

#[test]
fn test_ring_info_included_on_request() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);
    let mut req = request(&temp, &["audit"], &[], "ring");
    req.include_ring = true;

    let outcome = snapshot(&ctx, &temp.path().join("scratch"), &req).unwrap();

    assert!(outcome.manifest.ring_info);
    assert!(zip_text(&outcome.archive, "ring_info.txt").contains("Datacenter"));
}

#[test]
fn test_invalid_title_rejected_first() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let ctx = context(&node, &AssumeYes);

    let err = snapshot(&ctx, &temp.path().join("scratch"), &request(&temp, &[], &[], "../up")).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert!(node.queries.borrow().is_empty());
}

#[test]
fn test_upload_confirms_size_and_overwrite() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let archive = build_archive(&node, &temp, &["app"], "nightly");
    let bucket = DirectoryObjectStore::new(temp.path().join("bucket"));
    let remote = RemoteStore::new(&bucket);

    let prompt = ScriptedPrompt::new([ScriptedAnswer::Confirm(true)]);
    let outcome = upload_archive(&remote, &prompt, &archive, "nightly").unwrap();
    assert_eq!(
        outcome,
        UploadOutcome::Uploaded {
            key: "cassandra-snapshot-nightly".to_string(),
            bytes: fs::metadata(&archive).unwrap().len(),
        }
    );
    assert_eq!(prompt.asked().len(), 1);

    // Existing key: declining the overwrite is a collision
    let prompt = ScriptedPrompt::new([ScriptedAnswer::Confirm(true), ScriptedAnswer::Confirm(false)]);
    let err = upload_archive(&remote, &prompt, &archive, "nightly").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Collision);
    assert!(prompt.asked()[1].contains("already exists"));
}

#[test]
fn test_declined_upload_is_skipped() {
    let temp = TempDir::new().unwrap();
    let node = populated(&temp);
    let archive = build_archive(&node, &temp, &[], "nightly");
    let bucket = DirectoryObjectStore::new(temp.path().join("bucket"));
    let remote = RemoteStore::new(&bucket);

    let prompt = ScriptedPrompt::new([ScriptedAnswer::Confirm(false)]);
    let outcome = upload_archive(&remote, &prompt, &archive, "nightly").unwrap();

    assert_eq!(outcome, UploadOutcome::Skipped);
    assert!(remote.list_archives().unwrap().is_empty());
}
