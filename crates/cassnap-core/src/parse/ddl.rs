//! Schema DDL text
//!
//! An archive's schema is derived only from the `CREATE` statements in its
//! `schema.cql`. Tables must be keyspace-qualified (`CREATE TABLE ks.t`),
//! which is how `DESCRIBE` renders them.

use super::unexpected;
use crate::errors::Result;
use crate::model::names::{KeyspaceName, TableName};
use crate::model::schema::ArchiveSchema;
use regex::Regex;
use std::sync::LazyLock;

static CREATE_KEYSPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bCREATE\s+KEYSPACE\s+(?:IF\s+NOT\s+EXISTS\s+)?"?([A-Za-z0-9_]+)"?"#)
        .expect("valid keyspace regex")
});

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?"?([A-Za-z0-9_]+)"?\s*\.\s*"?([A-Za-z0-9_]+)"?"#,
    )
    .expect("valid table regex")
});

fn keyspace(name: &str) -> Result<KeyspaceName> {
    KeyspaceName::new(name).map_err(|e| unexpected("schema DDL", e.message().to_string()))
}

/// Derive keyspace → tables from DDL text, system keyspaces excluded
pub fn parse_archive_schema(ddl: &str) -> Result<ArchiveSchema> {
    let mut schema = ArchiveSchema::new();

    for caps in CREATE_KEYSPACE.captures_iter(ddl) {
        let ks = keyspace(&caps[1])?;
        if !ks.is_system() {
            schema.add_keyspace(ks);
        }
    }

    for caps in CREATE_TABLE.captures_iter(ddl) {
        let ks = keyspace(&caps[1])?;
        if ks.is_system() {
            continue;
        }
        let table = TableName::new(&caps[2])
            .map_err(|e| unexpected("schema DDL", e.message().to_string()))?;
        schema.add_table(ks, table);
    }

    Ok(schema)
}
