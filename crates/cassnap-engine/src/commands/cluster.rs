//! Multi-node orchestration
//!
//! Fan-out is delegated to a `RemoteExecutor` running named jobs
//! (`install`, `snapshot`, `restore`). Each job receives a flat parameter
//! map; node-side work is rendered as invocations of this same tool. The
//! jobs own file transfer between the nodes and the local workspace.

#![allow(clippy::result_large_err)]

use super::load::LoadedArchive;
use super::snapshot::{
    check_destination, default_cluster_title, discard_quietly, publish_archive, validate_title,
};
use cassnap_core::collaborators::{JobParams, RemoteExecutor};
use cassnap_core::errors::{Result, SnapError};
use cassnap_core::parse::parse_archive_schema;
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::{ArchiveManifest, OperatorPrompt, ResolvedScope, ScopeRequest};
use cassnap_store::archive::{seal_manifest, SCHEMA_FILE};
use cassnap_store::errors::io_error;
use cassnap_store::Workspace;
use std::fs;
use std::path::{Path, PathBuf};

pub const JOB_INSTALL: &str = "install";
pub const JOB_SNAPSHOT: &str = "snapshot";
pub const JOB_RESTORE: &str = "restore";

/// Hosts from the command line, else from configuration
pub fn resolve_hosts(given: &[String], configured: &[String]) -> Result<Vec<String>> {
    let source = if given.is_empty() { configured } else { given };
    let hosts: Vec<String> = source
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if hosts.is_empty() {
        return Err(SnapError::NoHosts.into());
    }
    Ok(hosts)
}

/// Nodes and the executor that reaches them
pub struct ClusterContext<'a> {
    pub hosts: Vec<String>,
    pub executor: &'a dyn RemoteExecutor,
    /// How nodes invoke this tool
    pub node_command: String,
    pub prompt: &'a dyn OperatorPrompt,
}

impl<'a> ClusterContext<'a> {
    fn base_params(&self) -> JobParams {
        let mut params = JobParams::new();
        params.insert("nodes".to_string(), self.hosts.join(" ").into());
        params
    }

    fn run(&self, job: &str, params: &JobParams) -> Result<()> {
        tracing::info!(job = job, nodes = self.hosts.len(), "Running remote job");
        let status = self.executor.run(job, params)?;
        if status != 0 {
            return Err(SnapError::JobFailed {
                job: job.to_string(),
                status,
            }
            .into());
        }
        Ok(())
    }

    /// `<node_command> <subcommand> [-k ks..] [-t table..]`
    fn node_invocation(&self, subcommand: &str, scope: &ScopeRequest) -> String {
        let mut parts = vec![self.node_command.clone(), subcommand.to_string()];
        if !scope.keyspaces.is_empty() {
            parts.push("-k".to_string());
            parts.extend(scope.keyspaces.iter().map(|k| k.to_string()));
        }
        if !scope.tables.is_empty() {
            parts.push("-t".to_string());
            parts.extend(scope.tables.iter().map(|t| t.to_string()));
        }
        parts.join(" ")
    }
}

/// Install this tool on every node
pub fn install(cluster: &ClusterContext<'_>) -> Result<()> {
    log_op_start!("install", nodes = cluster.hosts.len());
    let start = std::time::Instant::now();

    cluster.run(JOB_INSTALL, &cluster.base_params()).map_err(|e| {
        log_op_error!(
            "install",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!("install", duration_ms = start.elapsed().as_millis() as u64);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ClusterSnapshotRequest {
    pub scope: ScopeRequest,
    /// `None` uses unix seconds
    pub title: Option<String>,
    pub destination: PathBuf,
    pub overwrite: bool,
    /// Redeploy the tool on the nodes before running
    pub reload: bool,
}

#[derive(Debug, Clone)]
pub struct ClusterSnapshotOutcome {
    pub title: String,
    pub archive: PathBuf,
}

/// Snapshot every node and publish one archive
///
/// Scope existence is checked node-side; only its shape is checked here.
pub fn cluster_snapshot(
    cluster: &ClusterContext<'_>,
    scratch: &Path,
    request: &ClusterSnapshotRequest,
) -> Result<ClusterSnapshotOutcome> {
    log_op_start!("cluster_snapshot", nodes = cluster.hosts.len());
    let start = std::time::Instant::now();

    let outcome = cluster_snapshot_impl(cluster, scratch, request).map_err(|e| {
        log_op_error!(
            "cluster_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "cluster_snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        title = outcome.title.as_str()
    );
    Ok(outcome)
}

fn cluster_snapshot_impl(
    cluster: &ClusterContext<'_>,
    scratch: &Path,
    request: &ClusterSnapshotRequest,
) -> Result<ClusterSnapshotOutcome> {
    request.scope.check_shape()?;
    let title = request.title.clone().unwrap_or_else(default_cluster_title);
    validate_title(&title)?;
    let target = check_destination(&request.destination, &title, request.overwrite)?;

    let workspace = Workspace::prepare(scratch.join(&title))?;

    let mut params = cluster.base_params();
    params.insert(
        "snapshotter_command".to_string(),
        format!(
            "{} -y --title {}",
            cluster.node_invocation("snapshot", &request.scope),
            title
        )
        .into(),
    );
    let schema_scope = ScopeRequest {
        keyspaces: request.scope.keyspaces.clone(),
        tables: Vec::new(),
    };
    params.insert(
        "save_schema_command".to_string(),
        cluster.node_invocation("schema save", &schema_scope).into(),
    );
    params.insert(
        "path".to_string(),
        workspace.root().display().to_string().into(),
    );
    params.insert("reload".to_string(), request.reload.into());

    let published = cluster.run(JOB_SNAPSHOT, &params).and_then(|()| {
        let scope = captured_scope(workspace.root(), &request.scope)?;
        let mut manifest = ArchiveManifest::new(&title, &cluster.hosts.join(","), &scope);
        seal_manifest(workspace.root(), &mut manifest)?;
        publish_archive(workspace.root(), &request.destination, &title, &target)
    });

    match published {
        Ok(members) => {
            tracing::info!(archive = %target.display(), members = members, "Cluster archive published");
            workspace.discard()?;
            Ok(ClusterSnapshotOutcome {
                title,
                archive: target,
            })
        }
        Err(e) => {
            discard_quietly(workspace);
            Err(e)
        }
    }
}

/// Scope to record for a fetched cluster archive
///
/// Keyspaces and tables come from the fetched `schema.cql`, narrowed to
/// the request; without a schema file the request itself is recorded.
fn captured_scope(root: &Path, request: &ScopeRequest) -> Result<ResolvedScope> {
    let path = root.join(SCHEMA_FILE);
    let mut scope = ResolvedScope::new();
    if !path.is_file() {
        for keyspace in &request.keyspaces {
            scope
                .entry(keyspace.clone())
                .or_default()
                .extend(request.tables.iter().cloned());
        }
        return Ok(scope);
    }

    let ddl = fs::read_to_string(&path).map_err(|e| io_error("captured_scope", &path, e))?;
    let fetched = parse_archive_schema(&ddl)?;
    for (keyspace, tables) in fetched.keyspaces() {
        if !request.keyspaces.is_empty() && !request.keyspaces.contains(keyspace) {
            continue;
        }
        let entry = scope.entry(keyspace.clone()).or_default();
        if request.tables.is_empty() {
            entry.extend(tables.iter().cloned());
        } else {
            entry.extend(tables.iter().filter(|t| request.tables.contains(*t)).cloned());
        }
    }
    Ok(scope)
}

#[derive(Debug, Clone, Default)]
pub struct ClusterRestoreRequest {
    pub scope: ScopeRequest,
    pub reload: bool,
    /// Hard reset every node before restoring
    pub hard_reset: bool,
    /// Skip the operator confirmation
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterRestoreOutcome {
    Restored,
    /// The operator declined; no job ran
    Declined,
}

/// Restore a loaded archive on every node
///
/// The scope is validated against the archive schema before the operator
/// is asked. Once confirmed here, nodes restore without asking again.
pub fn cluster_restore(
    cluster: &ClusterContext<'_>,
    archive: &LoadedArchive,
    request: &ClusterRestoreRequest,
) -> Result<ClusterRestoreOutcome> {
    log_op_start!(
        "cluster_restore",
        nodes = cluster.hosts.len(),
        title = archive.title()
    );
    let start = std::time::Instant::now();

    let outcome = cluster_restore_impl(cluster, archive, request).map_err(|e| {
        log_op_error!(
            "cluster_restore",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "cluster_restore",
        duration_ms = start.elapsed().as_millis() as u64,
        declined = outcome == ClusterRestoreOutcome::Declined
    );
    Ok(outcome)
}

fn restore_question(cluster: &ClusterContext<'_>, archive: &LoadedArchive, hard_reset: bool) -> String {
    let mut question = format!(
        "Restoring '{}' drops every non-system keyspace on {} node(s)",
        archive.title(),
        cluster.hosts.len()
    );
    if hard_reset {
        question.push_str(" after a hard reset that wipes each node's data");
    }
    question.push_str(". Continue?");
    question
}

fn cluster_restore_impl(
    cluster: &ClusterContext<'_>,
    archive: &LoadedArchive,
    request: &ClusterRestoreRequest,
) -> Result<ClusterRestoreOutcome> {
    request.scope.resolve(archive.archive_schema())?;

    if !request.force {
        let question = restore_question(cluster, archive, request.hard_reset);
        if !cluster.prompt.confirm(&question)? {
            tracing::info!("Cluster restore declined");
            return Ok(ClusterRestoreOutcome::Declined);
        }
    }

    let mut params = cluster.base_params();
    params.insert(
        "restore_command".to_string(),
        format!("{} -y", cluster.node_invocation("restore", &request.scope)).into(),
    );
    let schema_scope = ScopeRequest {
        keyspaces: request.scope.keyspaces.clone(),
        tables: Vec::new(),
    };
    params.insert(
        "load_schema_command".to_string(),
        cluster.node_invocation("schema load", &schema_scope).into(),
    );
    params.insert(
        "path".to_string(),
        archive.root().display().to_string().into(),
    );
    params.insert("reload".to_string(), request.reload.into());
    params.insert("hard_reset".to_string(), request.hard_reset.into());

    cluster.run(JOB_RESTORE, &params)?;
    Ok(ClusterRestoreOutcome::Restored)
}
