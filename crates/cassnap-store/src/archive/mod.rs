//! Archive container
//!
//! ## Layout (format version 1)
//!
//! ```text
//! manifest.json              title, origin, scope, per-file SHA-256
//! schema.cql                 DDL of every archived keyspace
//! schemas.zip                <ks>/<ks>_schema.cql for each archived keyspace
//! ring_info.txt              token ring at snapshot time (optional)
//! <ks>/<table>/...           SSTable payload of one table
//! ```
//!
//! Member names always use `/` and never contain `.` or `..` components.

pub mod reader;
pub mod writer;

pub use reader::{extract_archive, extract_schemas, read_manifest, verify_digests};
pub use writer::{pack_directory, pack_schemas, seal_manifest};

use std::path::{Component, Path};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SCHEMA_FILE: &str = "schema.cql";
pub const SCHEMAS_ZIP: &str = "schemas.zip";
pub const RING_FILE: &str = "ring_info.txt";
/// Where `schemas.zip` is expanded inside a workspace
pub const SCHEMAS_DIR: &str = "schemas";

/// Member name of one keyspace's DDL inside `schemas.zip`
pub fn keyspace_schema_member(keyspace: &str) -> String {
    format!("{}/{}_schema.cql", keyspace, keyspace)
}

/// Member name of one table's payload directory
pub fn table_payload_member(keyspace: &str, table: &str) -> String {
    format!("{}/{}", keyspace, table)
}

/// Render a relative path as a member name, rejecting anything but plain
/// components
pub(crate) fn member_name(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir
            | Component::ParentDir
            | Component::RootDir
            | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
