//! Keyspace/table identifiers and the table-directory naming convention
//!
//! Cassandra stores a table's files under `<data_dir>/<keyspace>/<table>-<id>`
//! where `<id>` is the table's UUID rendered as 32 hex characters without
//! hyphens. The UUID is generated on every `CREATE TABLE`, so the directory
//! name of a table is not stable across a drop/recreate cycle.

use crate::errors::{ExError, ExErrorKind, Result, SnapError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Keyspaces owned by Cassandra itself. Never snapshotted, dropped or purged
/// at table level.
pub const SYSTEM_KEYSPACES: [&str; 5] = [
    "system",
    "system_schema",
    "system_auth",
    "system_distributed",
    "system_traces",
];

const MAX_IDENTIFIER_LEN: usize = 48;

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

macro_rules! cql_identifier {
    ($(#[$doc:meta])* $name:ident, $what:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                if is_identifier(&value) {
                    Ok(Self(value))
                } else {
                    Err(SnapError::InvalidIdentifier { what: $what, value }.into())
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Double-quoted form for CQL statements; unquoted identifiers
            /// are folded to lower case by the server
            pub fn quoted(&self) -> String {
                format!("\"{}\"", self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ExError;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ExError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

cql_identifier!(
    /// Top-level schema namespace
    KeyspaceName,
    "keyspace"
);

cql_identifier!(
    /// Table name, unique within its keyspace
    TableName,
    "table"
);

impl KeyspaceName {
    pub fn is_system(&self) -> bool {
        SYSTEM_KEYSPACES.contains(&self.0.as_str())
    }
}

/// On-disk directory name of a table: `<table>-<uuid as 32 hex chars>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableDirectory(String);

impl TableDirectory {
    /// Build the directory name from a table and its generated id
    pub fn new(table: &TableName, id: &Uuid) -> Self {
        Self(format!("{}-{}", table, id.simple()))
    }

    /// Build the directory name from the id text returned by
    /// `system_schema.tables`, which is hyphenated
    pub fn from_id_text(table: &TableName, id_text: &str) -> Result<Self> {
        let id = Uuid::parse_str(id_text.trim()).map_err(|e| {
            ExError::new(ExErrorKind::SchemaParse)
                .with_op("table_directory")
                .with_subject(table.as_str())
                .with_message(format!("Invalid table id '{}': {}", id_text.trim(), e))
        })?;
        Ok(Self::new(table, &id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
