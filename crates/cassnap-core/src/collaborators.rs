//! Seams to everything that runs outside this process
//!
//! The engine only talks to nodes, tools and storage through these traits.
//! Process-backed implementations live in the CLI crate; tests use
//! in-memory fakes.
//!
//! Exit statuses are returned as values, not errors: the caller decides
//! whether a non-zero status is fatal (a failed remote job) or collected
//! (a failed bulk load of one table). `Err` is reserved for "could not run
//! at all".

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::model::names::{KeyspaceName, TableName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// cqlsh-style query shell
pub trait CqlClient {
    /// Run a CQL statement (or a script of statements) and return the raw
    /// text cqlsh printed
    fn query(&self, host: &str, cql: &str) -> Result<String>;

    /// Cheapest possible round trip; `Ok` means the host answered
    fn ping(&self, host: &str) -> Result<()> {
        self.query(host, "SELECT release_version FROM system.local;")
            .map(|_| ())
    }
}

/// Node snapshot tool (nodetool)
pub trait SnapshotTool {
    /// Remove every snapshot on the node
    fn clear_snapshots(&self) -> Result<()>;

    /// Snapshot `keyspaces` under `title`; `table` restricts a
    /// single-keyspace snapshot to one table
    fn snapshot(
        &self,
        title: &str,
        keyspaces: &[KeyspaceName],
        table: Option<&TableName>,
    ) -> Result<()>;

    /// Token ring description
    fn ring(&self) -> Result<String>;
}

/// Bulk loader (sstableloader)
pub trait BulkLoader {
    /// Stream the SSTables under `source_dir` into the cluster at `hosts`
    fn load(&self, hosts: &[String], source_dir: &Path) -> Result<i32>;
}

/// One value in a remote job's parameter map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobParam {
    Text(String),
    Flag(bool),
}

impl From<&str> for JobParam {
    fn from(value: &str) -> Self {
        JobParam::Text(value.to_string())
    }
}

impl From<String> for JobParam {
    fn from(value: String) -> Self {
        JobParam::Text(value)
    }
}

impl From<bool> for JobParam {
    fn from(value: bool) -> Self {
        JobParam::Flag(value)
    }
}

/// Parameters handed to a remote job, serialized as a flat JSON object
pub type JobParams = BTreeMap<String, JobParam>;

/// Multi-node execution (ansible-playbook)
pub trait RemoteExecutor {
    /// Run `job` on the nodes named in `params`; returns the aggregate status
    fn run(&self, job: &str, params: &JobParams) -> Result<i32>;
}

/// Flat-key object store
pub trait ObjectStore {
    fn put(&self, key: &str, source: &Path) -> Result<()>;

    fn get(&self, key: &str, destination: &Path) -> Result<()>;

    /// Every key in the store, unfiltered
    fn list(&self) -> Result<Vec<String>>;
}

/// Database service lifecycle on the local node
pub trait ServiceControl {
    fn stop(&self) -> Result<()>;

    fn start(&self) -> Result<()>;
}
