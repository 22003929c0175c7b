//! Reconciliation planning
//!
//! Decides which entries under a node's data directory are orphans, given
//! the on-disk layout and the live schema. Planning never touches the
//! filesystem; `cassnap_store::reconcile_fs` scans the layout and applies
//! the plan.
//!
//! ## Rules
//!
//! 1. A top-level entry whose name is not a live keyspace (system keyspaces
//!    included) is removed.
//! 2. Inside a live non-system keyspace, every entry whose name is not the
//!    directory of a live table is removed.
//! 3. With backup purging on, files under a retained table's `backups/`
//!    are removed when their name ends in an allow-listed suffix.
//!
//! A live schema without any system keyspace is refused: it means the query
//! came back empty, and planning against it would remove everything.

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::schema::SchemaSnapshot;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Suffixes of files that may be purged from a table's `backups/` directory
pub const BACKUP_SUFFIXES: [&str; 5] = [".db", ".crc32", ".adler32", ".sha1", ".txt"];

/// Whether a file in `backups/` is an incremental-backup artifact
pub fn is_backup_artifact(file_name: &str) -> bool {
    BACKUP_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

/// What a data directory looks like on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskLayout {
    top_level: BTreeSet<String>,
    keyspace_entries: BTreeMap<String, BTreeSet<String>>,
    backup_files: BTreeMap<(String, String), BTreeSet<String>>,
}

impl DiskLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a direct child of the data directory
    pub fn add_top_level(&mut self, name: impl Into<String>) {
        self.top_level.insert(name.into());
    }

    /// Record an entry inside a keyspace directory
    pub fn add_keyspace_entry(&mut self, keyspace: impl Into<String>, entry: impl Into<String>) {
        let keyspace = keyspace.into();
        self.top_level.insert(keyspace.clone());
        self.keyspace_entries
            .entry(keyspace)
            .or_default()
            .insert(entry.into());
    }

    /// Record a file inside `<keyspace>/<table_dir>/backups/`
    pub fn add_backup_file(
        &mut self,
        keyspace: impl Into<String>,
        table_dir: impl Into<String>,
        file: impl Into<String>,
    ) {
        let keyspace = keyspace.into();
        let table_dir = table_dir.into();
        self.add_keyspace_entry(keyspace.clone(), table_dir.clone());
        self.backup_files
            .entry((keyspace, table_dir))
            .or_default()
            .insert(file.into());
    }

    pub fn top_level(&self) -> &BTreeSet<String> {
        &self.top_level
    }

    pub fn keyspace_entries(&self, keyspace: &str) -> Option<&BTreeSet<String>> {
        self.keyspace_entries.get(keyspace)
    }

    fn backup_files(&self, keyspace: &str, table_dir: &str) -> Option<&BTreeSet<String>> {
        self.backup_files
            .get(&(keyspace.to_string(), table_dir.to_string()))
    }
}

/// One entry to delete, relative to the data directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Removal {
    /// `<entry>` at the top level
    Keyspace { name: String },
    /// `<keyspace>/<entry>`
    TableDirectory { keyspace: String, entry: String },
    /// `<keyspace>/<table_dir>/backups/<file>`
    BackupFile {
        keyspace: String,
        table_dir: String,
        file: String,
    },
}

impl Removal {
    /// Path components relative to the data directory
    pub fn components(&self) -> Vec<&str> {
        match self {
            Removal::Keyspace { name } => vec![name],
            Removal::TableDirectory { keyspace, entry } => vec![keyspace, entry],
            Removal::BackupFile {
                keyspace,
                table_dir,
                file,
            } => vec![keyspace, table_dir, "backups", file],
        }
    }
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components().join("/"))
    }
}

/// Ordered list of removals: keyspaces, then table directories, then files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub removals: Vec<Removal>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removals.len()
    }
}

/// Plan the removals that bring `layout` in line with `live`
///
/// `live` must cover every live keyspace, system keyspaces included.
pub fn plan(layout: &DiskLayout, live: &SchemaSnapshot, purge_backups: bool) -> Result<ReconcilePlan> {
    if !live.keyspaces().any(|k| k.is_system()) {
        return Err(ExError::new(ExErrorKind::Validation)
            .with_op("plan_reconcile")
            .with_subject(live.host())
            .with_message(
                "Live schema lists no system keyspaces; refusing to plan directory removal",
            ));
    }

    let mut removals = Vec::new();

    for name in layout.top_level() {
        if !live.contains_keyspace_dir(name) {
            removals.push(Removal::Keyspace { name: name.clone() });
        }
    }

    for keyspace in live.keyspaces().filter(|k| !k.is_system()) {
        let Some(on_disk) = layout.keyspace_entries(keyspace.as_str()) else {
            continue;
        };
        let expected = live.expected_directories(keyspace);

        for entry in on_disk.difference(&expected) {
            removals.push(Removal::TableDirectory {
                keyspace: keyspace.to_string(),
                entry: entry.clone(),
            });
        }

        if purge_backups {
            for table_dir in on_disk.intersection(&expected) {
                let Some(files) = layout.backup_files(keyspace.as_str(), table_dir) else {
                    continue;
                };
                for file in files.iter().filter(|f| is_backup_artifact(f)) {
                    removals.push(Removal::BackupFile {
                        keyspace: keyspace.to_string(),
                        table_dir: table_dir.clone(),
                        file: file.clone(),
                    });
                }
            }
        }
    }

    Ok(ReconcilePlan { removals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::names::{KeyspaceName, TableDirectory, TableName};
    use uuid::Uuid;

    fn live_with(tables: &[(&str, &str, Uuid)]) -> SchemaSnapshot {
        let mut live = SchemaSnapshot::new("localhost");
        live.insert_keyspace(KeyspaceName::new("system").unwrap(), BTreeMap::new());
        let mut by_ks: BTreeMap<KeyspaceName, BTreeMap<TableName, TableDirectory>> =
            BTreeMap::new();
        for (ks, t, id) in tables {
            let table = TableName::new(*t).unwrap();
            by_ks
                .entry(KeyspaceName::new(*ks).unwrap())
                .or_default()
                .insert(table.clone(), TableDirectory::new(&table, id));
        }
        for (ks, t) in by_ks {
            live.insert_keyspace(ks, t);
        }
        live
    }

    #[test]
    fn test_orphans_are_planned() {
        let id = Uuid::new_v4();
        let live = live_with(&[("app", "t1", id)]);
        let current = format!("t1-{}", id.simple());

        let mut layout = DiskLayout::new();
        layout.add_top_level("system");
        layout.add_top_level("dropped_ks");
        layout.add_keyspace_entry("app", current.clone());
        layout.add_keyspace_entry("app", "t1-00000000000000000000000000000000");

        let plan = plan(&layout, &live, false).unwrap();
        assert_eq!(
            plan.removals,
            vec![
                Removal::Keyspace {
                    name: "dropped_ks".into()
                },
                Removal::TableDirectory {
                    keyspace: "app".into(),
                    entry: "t1-00000000000000000000000000000000".into()
                },
            ]
        );
    }

    #[test]
    fn test_system_keyspace_contents_untouched() {
        let live = live_with(&[]);
        let mut layout = DiskLayout::new();
        layout.add_keyspace_entry("system", "anything-at-all");
        assert!(plan(&layout, &live, true).unwrap().is_empty());
    }

    #[test]
    fn test_backup_purge_respects_allow_list() {
        let id = Uuid::new_v4();
        let live = live_with(&[("app", "t1", id)]);
        let dir = format!("t1-{}", id.simple());

        let mut layout = DiskLayout::new();
        layout.add_top_level("system");
        layout.add_backup_file("app", dir.clone(), "mc-1-big-Data.db");
        layout.add_backup_file("app", dir.clone(), "mc-1-big-Digest.crc32");
        layout.add_backup_file("app", dir.clone(), "operator-notes.md");

        let plan = plan(&layout, &live, true).unwrap();
        let files: Vec<String> = plan.removals.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            files,
            vec![
                format!("app/{}/backups/mc-1-big-Data.db", dir),
                format!("app/{}/backups/mc-1-big-Digest.crc32", dir),
            ]
        );
    }

    #[test]
    fn test_backups_ignored_without_flag() {
        let id = Uuid::new_v4();
        let live = live_with(&[("app", "t1", id)]);
        let mut layout = DiskLayout::new();
        layout.add_top_level("system");
        layout.add_backup_file("app", format!("t1-{}", id.simple()), "x.db");
        assert!(plan(&layout, &live, false).unwrap().is_empty());
    }

    #[test]
    fn test_empty_live_schema_refused() {
        let live = SchemaSnapshot::new("10.0.0.9");
        let mut layout = DiskLayout::new();
        layout.add_top_level("app");
        let err = plan(&layout, &live, false).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Validation);
        assert_eq!(err.subject(), Some("10.0.0.9"));
    }

    #[test]
    fn test_is_backup_artifact() {
        assert!(is_backup_artifact("na-3-big-Digest.adler32"));
        assert!(is_backup_artifact("x.sha1"));
        assert!(!is_backup_artifact("x.dbx"));
    }
}
