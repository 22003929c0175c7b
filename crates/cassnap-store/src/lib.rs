//! cassnap store - everything that touches the local filesystem
//!
//! Provides:
//! - Scratch workspaces and tree copies
//! - Atomic publishing of finished archives
//! - The archive zip codec (pack, extract, digest verification)
//! - `cassandra.yaml` discovery
//! - Data-directory scanning and reconciliation plan application
//! - Remote archive naming and selection over an `ObjectStore`

pub mod archive;
pub mod atomic;
pub mod errors;
pub mod node_settings;
pub mod reconcile_fs;
pub mod remote;
pub mod workspace;

// Re-export key types
pub use errors::Result;
pub use node_settings::NodeSettings;
pub use remote::{DirectoryObjectStore, RemoteStore, REMOTE_PREFIX};
pub use workspace::Workspace;
