//! Archive building
//!
//! Validation happens in full before the first side effect: title, scope
//! shape, destination collision, reachability and scope existence. Only then
//! are node snapshots cleared and retaken.
//!
//! The collision check is a pre-flight existence check, not a lock. Two
//! concurrent builds with the same title can still race; the later rename
//! wins.

#![allow(clippy::result_large_err)]

use super::schema::{write_ring_info, write_schema_files};
use crate::context::NodeContext;
use cassnap_core::errors::{Result, SnapError};
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::{ArchiveManifest, KeyspaceName, OperatorPrompt, ResolvedScope, ScopeRequest};
use cassnap_store::archive::{pack_directory, seal_manifest, table_payload_member};
use cassnap_store::atomic::{archive_path, partial_path, PartialFile};
use cassnap_store::errors::io_error;
use cassnap_store::workspace::copy_tree;
use cassnap_store::{RemoteStore, Workspace};
use std::fs;
use std::path::{Path, PathBuf};

/// Reject titles that cannot be a single archive file name
pub fn validate_title(title: &str) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(SnapError::InvalidTitle {
            title: title.to_string(),
            reason: reason.to_string(),
        }
        .into())
    };

    if title.is_empty() {
        return invalid("title is empty");
    }
    if title == "." || title == ".." || title.starts_with('.') {
        return invalid("title must not start with '.'");
    }
    if title.contains('/') || title.contains('\\') {
        return invalid("title must be a single path component");
    }
    if title.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return invalid("title must not contain whitespace or control characters");
    }
    Ok(())
}

/// Title of a single-node snapshot taken now
pub fn default_title() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Title of a cluster snapshot taken now (unix seconds)
pub fn default_cluster_title() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// `<dest>/<title>.zip`, or `ArchiveExists` if present and not overwriting
pub(crate) fn check_destination(dest: &Path, title: &str, overwrite: bool) -> Result<PathBuf> {
    let target = archive_path(dest, title);
    if target.exists() {
        if !overwrite {
            return Err(SnapError::ArchiveExists {
                path: target.display().to_string(),
            }
            .into());
        }
        tracing::warn!(archive = %target.display(), "Existing archive will be replaced");
    }
    Ok(target)
}

/// Pack `content` next to `target` and rename it into place
pub(crate) fn publish_archive(content: &Path, dest: &Path, title: &str, target: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| io_error("publish_archive", dest, e))?;
    let partial = PartialFile::new(partial_path(dest, title));
    let members = pack_directory(content, partial.path())?;
    partial.publish(target)?;
    Ok(members)
}

/// Discard a workspace after a failed run without masking the failure
pub(crate) fn discard_quietly(workspace: Workspace) {
    let root = workspace.root().to_path_buf();
    if let Err(e) = workspace.discard() {
        tracing::warn!(workspace = %root.display(), error = %e, "Failed to discard workspace");
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub scope: ScopeRequest,
    /// `None` uses `default_title()`
    pub title: Option<String>,
    /// Directory the archive is published into
    pub destination: PathBuf,
    /// Replace an existing archive of the same title
    pub overwrite: bool,
    pub include_ring: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub title: String,
    pub archive: PathBuf,
    pub manifest: ArchiveManifest,
    /// `keyspace.table` entries whose snapshot directory was missing
    pub skipped: Vec<String>,
}

/// Build `<destination>/<title>.zip` from the node behind `ctx`
///
/// # Errors
///
/// - `Validation` for a bad title, a malformed or unknown scope, or a host
///   without user keyspaces
/// - `Collision` if the archive exists and `overwrite` is not set
/// - `Connectivity` if the host does not answer
pub fn snapshot(ctx: &NodeContext<'_>, scratch: &Path, request: &SnapshotRequest) -> Result<SnapshotOutcome> {
    log_op_start!("snapshot", host = ctx.host.as_str());
    let start = std::time::Instant::now();

    let outcome = snapshot_impl(ctx, scratch, request).map_err(|e| {
        log_op_error!(
            "snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        title = outcome.title.as_str(),
        skipped = outcome.skipped.len()
    );
    Ok(outcome)
}

fn snapshot_impl(ctx: &NodeContext<'_>, scratch: &Path, request: &SnapshotRequest) -> Result<SnapshotOutcome> {
    let title = request.title.clone().unwrap_or_else(default_title);
    validate_title(&title)?;
    request.scope.check_shape()?;
    let target = check_destination(&request.destination, &title, request.overwrite)?;

    let inspector = ctx.inspector();
    inspector.ensure_reachable(&ctx.host)?;
    let live = inspector.live_schema(&ctx.host)?;
    if live.is_empty() {
        return Err(SnapError::NoKeyspaces {
            host: ctx.host.clone(),
        }
        .into());
    }
    let resolved = request.scope.resolve(&live)?;

    let workspace = Workspace::prepare(scratch)?;
    match build(ctx, &workspace, request, &title, &target, &resolved, &live) {
        Ok(outcome) => {
            workspace.discard()?;
            Ok(outcome)
        }
        Err(e) => {
            discard_quietly(workspace);
            Err(e)
        }
    }
}

fn build(
    ctx: &NodeContext<'_>,
    workspace: &Workspace,
    request: &SnapshotRequest,
    title: &str,
    target: &Path,
    resolved: &ResolvedScope,
    live: &cassnap_core::SchemaSnapshot,
) -> Result<SnapshotOutcome> {
    let content = workspace.child("archive")?;
    let staging = workspace.child("schemas")?;
    let keyspaces: Vec<KeyspaceName> = resolved.keys().cloned().collect();

    ctx.snapshots.clear_snapshots()?;
    match request.scope.table_keyspace() {
        Some(keyspace) => {
            for table in resolved.get(keyspace).into_iter().flatten() {
                ctx.snapshots
                    .snapshot(title, std::slice::from_ref(keyspace), Some(table))?;
            }
        }
        None => ctx.snapshots.snapshot(title, &keyspaces, None)?,
    }

    let mut captured = ResolvedScope::new();
    let mut skipped = Vec::new();
    for (keyspace, tables) in resolved {
        let entry = captured.entry(keyspace.clone()).or_default();
        for table in tables {
            let source = live.directory(keyspace, table).map(|dir| {
                ctx.data_dir
                    .join(keyspace.as_str())
                    .join(dir.as_str())
                    .join("snapshots")
                    .join(title)
            });
            match source {
                Some(source) if source.is_dir() => {
                    let dest = content
                        .root()
                        .join(table_payload_member(keyspace.as_str(), table.as_str()));
                    let files = copy_tree(&source, &dest)?;
                    tracing::debug!(keyspace = %keyspace, table = %table, files = files, "Payload copied");
                    entry.insert(table.clone());
                }
                _ => {
                    tracing::warn!(keyspace = %keyspace, table = %table, "No snapshot directory; table skipped");
                    skipped.push(format!("{}.{}", keyspace, table));
                }
            }
        }
    }

    write_schema_files(
        &ctx.inspector(),
        &ctx.host,
        &keyspaces,
        request.scope.keyspaces.is_empty(),
        content.root(),
        &staging,
    )?;
    if request.include_ring {
        write_ring_info(ctx, content.root())?;
    }

    let mut manifest = ArchiveManifest::new(title, &ctx.host, &captured);
    manifest.ring_info = request.include_ring;
    seal_manifest(content.root(), &mut manifest)?;

    let members = publish_archive(content.root(), &request.destination, title, target)?;
    tracing::info!(archive = %target.display(), members = members, "Archive published");

    Ok(SnapshotOutcome {
        title: title.to_string(),
        archive: target.to_path_buf(),
        manifest,
        skipped,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { key: String, bytes: u64 },
    /// The operator declined the upload
    Skipped,
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Upload a published archive as `cassandra-snapshot-<title>`
///
/// The operator confirms the size first; an existing key needs a second,
/// explicit confirmation, and declining it is a `Collision`.
pub fn upload_archive(
    remote: &RemoteStore<'_>,
    prompt: &dyn OperatorPrompt,
    archive: &Path,
    title: &str,
) -> Result<UploadOutcome> {
    log_op_start!("upload_archive", title = title);
    let start = std::time::Instant::now();

    let outcome = upload_archive_impl(remote, prompt, archive, title).map_err(|e| {
        log_op_error!(
            "upload_archive",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "upload_archive",
        duration_ms = start.elapsed().as_millis() as u64
    );
    Ok(outcome)
}

fn upload_archive_impl(
    remote: &RemoteStore<'_>,
    prompt: &dyn OperatorPrompt,
    archive: &Path,
    title: &str,
) -> Result<UploadOutcome> {
    validate_title(title)?;
    let bytes = fs::metadata(archive)
        .map_err(|e| io_error("upload_archive", archive, e))?
        .len();

    if !prompt.confirm(&format!(
        "Upload {} ({}) to the remote store?",
        archive.display(),
        human_size(bytes)
    ))? {
        tracing::info!(archive = %archive.display(), "Upload skipped");
        return Ok(UploadOutcome::Skipped);
    }

    let key = RemoteStore::key_for(title);
    if remote.exists(&key)?
        && !prompt.confirm(&format!("Remote archive {} already exists. Overwrite?", key))?
    {
        return Err(SnapError::RemoteKeyExists { key }.into());
    }

    remote.upload(&key, archive)?;
    Ok(UploadOutcome::Uploaded { key, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassnap_core::ExErrorKind;

    #[test]
    fn test_title_rules() {
        assert!(validate_title("2024-01-01_00-00-00").is_ok());
        assert!(validate_title("nightly").is_ok());
        for bad in ["", ".", "..", ".hidden", "a/b", "a\\b", "two words", "tab\there"] {
            let err = validate_title(bad).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::Validation, "{:?}", bad);
        }
    }

    #[test]
    fn test_default_titles_are_valid() {
        assert!(validate_title(&default_title()).is_ok());
        let cluster = default_cluster_title();
        assert!(cluster.parse::<i64>().is_ok());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_collision_without_overwrite() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("nightly.zip"), b"old").unwrap();
        let err = check_destination(temp.path(), "nightly", false).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Collision);
        assert!(check_destination(temp.path(), "nightly", true).is_ok());
        assert!(check_destination(temp.path(), "weekly", false).is_ok());
    }
}
