//! Parsing boundary
//!
//! Every piece of collaborator output the engine reasons about is turned
//! into typed values here and nowhere else:
//! - `tabular`: cqlsh result tables (`SELECT ...`)
//! - `keyspaces`: `DESCRIBE KEYSPACES` listings
//! - `ddl`: `CREATE KEYSPACE` / `CREATE TABLE` statements in schema text

pub mod ddl;
pub mod keyspaces;
pub mod tabular;

pub use ddl::parse_archive_schema;
pub use keyspaces::parse_keyspace_list;
pub use tabular::{parse_cql_table, parse_table_directories, CqlTable};

use crate::errors::{ExError, SnapError};

pub(crate) fn unexpected(what: &str, reason: impl Into<String>) -> ExError {
    ExError::from(SnapError::UnexpectedOutput {
        what: what.to_string(),
        reason: reason.into(),
    })
    .with_op("parse")
}
