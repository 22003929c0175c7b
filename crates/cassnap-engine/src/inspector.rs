//! Live schema inspection
//!
//! Every call goes to the database; nothing is cached between calls, so a
//! snapshot taken after a schema change always sees the new directory names.

#![allow(clippy::result_large_err)]

use cassnap_core::collaborators::CqlClient;
use cassnap_core::errors::{ExError, ExErrorKind, Result, SnapError};
use cassnap_core::parse::{parse_keyspace_list, parse_table_directories};
use cassnap_core::{KeyspaceName, SchemaSnapshot, TableDirectory, TableName};
use std::collections::{BTreeMap, BTreeSet};

pub struct SchemaInspector<'a> {
    cql: &'a dyn CqlClient,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(cql: &'a dyn CqlClient) -> Self {
        Self { cql }
    }

    /// Fail with `Connectivity` unless the host answers and lists its
    /// system keyspaces
    pub fn ensure_reachable(&self, host: &str) -> Result<()> {
        let unreachable = |reason: String| -> ExError {
            ExError::from(SnapError::HostUnreachable {
                host: host.to_string(),
                reason,
            })
            .with_op("ensure_reachable")
        };

        let keyspaces = self
            .cql
            .query(host, "DESCRIBE KEYSPACES;")
            .and_then(|out| parse_keyspace_list(&out))
            .map_err(|e| match e.kind() {
                ExErrorKind::Connectivity => e,
                _ => unreachable(e.message().to_string()),
            })?;

        if !keyspaces.iter().any(KeyspaceName::is_system) {
            return Err(unreachable("no system keyspaces visible".to_string()));
        }
        Ok(())
    }

    /// `DESCRIBE KEYSPACES`, system keyspaces dropped unless asked for
    pub fn list_keyspaces(&self, host: &str, include_system: bool) -> Result<BTreeSet<KeyspaceName>> {
        let output = self.cql.query(host, "DESCRIBE KEYSPACES;")?;
        let mut keyspaces = parse_keyspace_list(&output)?;
        if !include_system {
            keyspaces.retain(|k| !k.is_system());
        }
        tracing::debug!(host = host, count = keyspaces.len(), "Listed keyspaces");
        Ok(keyspaces)
    }

    /// Table → directory name for one keyspace
    pub fn table_directories(
        &self,
        host: &str,
        keyspace: &KeyspaceName,
    ) -> Result<BTreeMap<TableName, TableDirectory>> {
        let cql = format!(
            "SELECT table_name, id FROM system_schema.tables WHERE keyspace_name='{}';",
            keyspace
        );
        let output = self.cql.query(host, &cql)?;
        parse_table_directories(&output).map_err(|e| e.with_subject(keyspace.as_str()))
    }

    /// One query per keyspace
    pub fn directory_structure<'k>(
        &self,
        host: &str,
        keyspaces: impl IntoIterator<Item = &'k KeyspaceName>,
    ) -> Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::new(host);
        for keyspace in keyspaces {
            let tables = self.table_directories(host, keyspace)?;
            snapshot.insert_keyspace(keyspace.clone(), tables);
        }
        Ok(snapshot)
    }

    /// Directory structure of every non-system keyspace
    pub fn live_schema(&self, host: &str) -> Result<SchemaSnapshot> {
        let keyspaces = self.list_keyspaces(host, false)?;
        self.directory_structure(host, &keyspaces)
    }

    /// Directory structure of every keyspace, system keyspaces included
    pub fn full_schema(&self, host: &str) -> Result<SchemaSnapshot> {
        let keyspaces = self.list_keyspaces(host, true)?;
        self.directory_structure(host, &keyspaces)
    }

    /// DDL of the whole non-system schema
    pub fn describe_schema(&self, host: &str) -> Result<String> {
        self.cql.query(host, "DESCRIBE SCHEMA;")
    }

    pub fn describe_keyspace(&self, host: &str, keyspace: &KeyspaceName) -> Result<String> {
        self.cql
            .query(host, &format!("DESCRIBE KEYSPACE {};", keyspace.quoted()))
    }
}
