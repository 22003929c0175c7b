//! Collaborators bound to one node

use cassnap_core::collaborators::{CqlClient, SnapshotTool};
use cassnap_core::OperatorPrompt;
use std::path::PathBuf;

/// Everything a node-local command needs to reach the database and disk
pub struct NodeContext<'a> {
    /// Address cqlsh connects to
    pub host: String,
    /// First entry of `data_file_directories`
    pub data_dir: PathBuf,
    pub cql: &'a dyn CqlClient,
    pub snapshots: &'a dyn SnapshotTool,
    pub prompt: &'a dyn OperatorPrompt,
}

impl<'a> NodeContext<'a> {
    pub fn inspector(&self) -> crate::inspector::SchemaInspector<'a> {
        crate::inspector::SchemaInspector::new(self.cql)
    }
}
