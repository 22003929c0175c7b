//! cassnap core - schema model, scope rules and parsing boundary
//!
//! This crate holds everything the snapshot/restore engine reasons about
//! without touching a node:
//! - Keyspace/table identifiers and the table-directory naming convention
//! - Live (`SchemaSnapshot`) and archived (`ArchiveSchema`) schema views
//! - Scope requests and their validation against a schema authority
//! - The single parsing boundary for cqlsh output and DDL text
//! - Reconciliation planning (which on-disk entries are orphans)
//! - Collaborator traits for everything that runs outside this process
//! - Configuration, error facility and logging facility

pub mod collaborators;
pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod reconcile;

// Re-export commonly used types
pub use config::Config;
pub use errors::{ExError, ExErrorKind, Result, SnapError};
pub use model::{
    ArchiveManifest, ArchiveSchema, KeyspaceName, ResolvedScope, SchemaAuthority, SchemaSnapshot,
    ScopeRequest, TableDirectory, TableName,
};
pub use prompt::{AssumeNo, AssumeYes, OperatorPrompt};
