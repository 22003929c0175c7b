//! Data-directory side of reconciliation
//!
//! `scan_layout` reads what is on disk, `cassnap_core::reconcile::plan`
//! decides, `apply_plan` deletes. Nothing here decides what is an orphan.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use cassnap_core::reconcile::{DiskLayout, ReconcilePlan};
use cassnap_core::SchemaSnapshot;
use std::fs;
use std::path::Path;

fn entry_names(dir: &Path, files_only: bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| io_error("scan_layout", dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error("scan_layout", dir, e))?;
        if files_only {
            let file_type = entry
                .file_type()
                .map_err(|e| io_error("scan_layout", &entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => {
                tracing::warn!(dir = %dir.display(), name = ?raw, "Skipping non UTF-8 entry");
            }
        }
    }
    Ok(names)
}

/// Read the parts of `data_dir` the planner needs
///
/// Keyspace contents are only listed for live non-system keyspaces, and
/// `backups/` only for directories of live tables when `purge_backups`.
pub fn scan_layout(data_dir: &Path, live: &SchemaSnapshot, purge_backups: bool) -> Result<DiskLayout> {
    let mut layout = DiskLayout::new();

    for name in entry_names(data_dir, false)? {
        layout.add_top_level(name);
    }

    for keyspace in live.keyspaces().filter(|k| !k.is_system()) {
        let ks_dir = data_dir.join(keyspace.as_str());
        if !ks_dir.is_dir() {
            continue;
        }
        let expected = live.expected_directories(keyspace);
        for entry in entry_names(&ks_dir, false)? {
            let backups = ks_dir.join(&entry).join("backups");
            if purge_backups && expected.contains(&entry) && backups.is_dir() {
                for file in entry_names(&backups, true)? {
                    layout.add_backup_file(keyspace.as_str(), entry.clone(), file);
                }
            }
            layout.add_keyspace_entry(keyspace.as_str(), entry);
        }
    }

    Ok(layout)
}

/// Execute a plan; returns the number of entries removed
pub fn apply_plan(data_dir: &Path, plan: &ReconcilePlan) -> Result<usize> {
    let mut removed = 0;
    for removal in &plan.removals {
        let path = removal
            .components()
            .iter()
            .fold(data_dir.to_path_buf(), |p, c| p.join(c));

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(io_error("apply_reconcile", &path, e)),
        };

        tracing::warn!(path = %path.display(), "Deleting orphaned entry");
        if meta.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| io_error("apply_reconcile", &path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| io_error("apply_reconcile", &path, e))?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassnap_core::reconcile::plan;
    use cassnap_core::{KeyspaceName, TableDirectory, TableName};
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_scan_then_apply_removes_only_orphans() {
        let temp = TempDir::new().unwrap();
        let data = temp.path();
        let id = Uuid::new_v4();
        let t1 = TableName::new("t1").unwrap();
        let current = TableDirectory::new(&t1, &id);

        fs::create_dir_all(data.join("system/local-1")).unwrap();
        fs::create_dir_all(data.join("app").join(current.as_str())).unwrap();
        fs::create_dir_all(data.join("app/t1-deadbeefdeadbeefdeadbeefdeadbeef")).unwrap();
        fs::create_dir_all(data.join("gone_ks/t-1")).unwrap();

        let mut live = SchemaSnapshot::new("localhost");
        live.insert_keyspace(KeyspaceName::new("system").unwrap(), BTreeMap::new());
        live.insert_keyspace(
            KeyspaceName::new("app").unwrap(),
            BTreeMap::from([(t1, current.clone())]),
        );

        let layout = scan_layout(data, &live, false).unwrap();
        let first = plan(&layout, &live, false).unwrap();
        assert_eq!(apply_plan(data, &first).unwrap(), 2);

        assert!(data.join("app").join(current.as_str()).is_dir());
        assert!(data.join("system/local-1").is_dir());
        assert!(!data.join("gone_ks").exists());

        let layout = scan_layout(data, &live, false).unwrap();
        assert!(plan(&layout, &live, false).unwrap().is_empty());
    }
}
