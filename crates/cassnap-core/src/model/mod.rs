//! Schema and archive model

pub mod manifest;
pub mod names;
pub mod schema;
pub mod scope;

pub use manifest::{ArchiveManifest, MANIFEST_FORMAT_VERSION};
pub use names::{KeyspaceName, TableDirectory, TableName, SYSTEM_KEYSPACES};
pub use schema::{ArchiveSchema, SchemaAuthority, SchemaSnapshot};
pub use scope::{ResolvedScope, ScopeRequest};
