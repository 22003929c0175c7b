//! Live and archived schema views
//!
//! Two authorities answer "does this keyspace/table exist": the live database
//! (`SchemaSnapshot`, which also knows each table's directory) and an
//! archive's DDL (`ArchiveSchema`, names only). Scope validation is written
//! against the `SchemaAuthority` trait so each operation picks its authority
//! explicitly.

use crate::model::names::{KeyspaceName, TableDirectory, TableName};
use std::collections::{BTreeMap, BTreeSet};

/// Something a scope can be validated against
pub trait SchemaAuthority {
    /// Human-readable name used in error messages
    fn describe(&self) -> String;

    fn keyspace_names(&self) -> BTreeSet<KeyspaceName>;

    /// Tables of a keyspace, `None` if the keyspace is unknown
    fn table_names(&self, keyspace: &KeyspaceName) -> Option<BTreeSet<TableName>>;

    fn has_keyspace(&self, keyspace: &KeyspaceName) -> bool {
        self.table_names(keyspace).is_some()
    }
}

/// Keyspace → table → directory, captured from one host at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    host: String,
    keyspaces: BTreeMap<KeyspaceName, BTreeMap<TableName, TableDirectory>>,
}

impl SchemaSnapshot {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            keyspaces: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn insert_keyspace(
        &mut self,
        keyspace: KeyspaceName,
        tables: BTreeMap<TableName, TableDirectory>,
    ) {
        self.keyspaces.insert(keyspace, tables);
    }

    pub fn keyspaces(&self) -> impl Iterator<Item = &KeyspaceName> {
        self.keyspaces.keys()
    }

    pub fn tables(&self, keyspace: &KeyspaceName) -> Option<&BTreeMap<TableName, TableDirectory>> {
        self.keyspaces.get(keyspace)
    }

    pub fn directory(&self, keyspace: &KeyspaceName, table: &TableName) -> Option<&TableDirectory> {
        self.keyspaces.get(keyspace).and_then(|t| t.get(table))
    }

    /// Directory names Cassandra should currently have on disk for a keyspace
    pub fn expected_directories(&self, keyspace: &KeyspaceName) -> BTreeSet<String> {
        self.keyspaces
            .get(keyspace)
            .map(|tables| tables.values().map(|d| d.as_str().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn contains_keyspace_dir(&self, name: &str) -> bool {
        self.keyspaces.keys().any(|k| k.as_str() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.keyspaces.is_empty()
    }
}

impl SchemaAuthority for SchemaSnapshot {
    fn describe(&self) -> String {
        format!("live schema on {}", self.host)
    }

    fn keyspace_names(&self) -> BTreeSet<KeyspaceName> {
        self.keyspaces.keys().cloned().collect()
    }

    fn table_names(&self, keyspace: &KeyspaceName) -> Option<BTreeSet<TableName>> {
        self.keyspaces
            .get(keyspace)
            .map(|t| t.keys().cloned().collect())
    }
}

/// Keyspace → tables, derived from an archive's DDL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSchema {
    keyspaces: BTreeMap<KeyspaceName, BTreeSet<TableName>>,
}

impl ArchiveSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a keyspace that may have no tables
    pub fn add_keyspace(&mut self, keyspace: KeyspaceName) {
        self.keyspaces.entry(keyspace).or_default();
    }

    pub fn add_table(&mut self, keyspace: KeyspaceName, table: TableName) {
        self.keyspaces.entry(keyspace).or_default().insert(table);
    }

    pub fn keyspaces(&self) -> &BTreeMap<KeyspaceName, BTreeSet<TableName>> {
        &self.keyspaces
    }

    pub fn is_empty(&self) -> bool {
        self.keyspaces.is_empty()
    }
}

impl SchemaAuthority for ArchiveSchema {
    fn describe(&self) -> String {
        "archive schema".to_string()
    }

    fn keyspace_names(&self) -> BTreeSet<KeyspaceName> {
        self.keyspaces.keys().cloned().collect()
    }

    fn table_names(&self, keyspace: &KeyspaceName) -> Option<BTreeSet<TableName>> {
        self.keyspaces.get(keyspace).cloned()
    }
}
