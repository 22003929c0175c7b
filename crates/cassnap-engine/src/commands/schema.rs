//! Schema DDL capture and replay
//!
//! `save_schema` writes `schema.cql`, `schemas.zip` and optionally
//! `ring_info.txt` into a directory; `load_schema` replays them. Archive
//! building and restoring use the same helpers, and the node-side
//! `schema save` / `schema load` commands expose them directly for cluster
//! runs.

#![allow(clippy::result_large_err)]

use crate::context::NodeContext;
use crate::inspector::SchemaInspector;
use cassnap_core::errors::{ExError, ExErrorKind, Result, SnapError};
use cassnap_core::model::scope::unique;
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::{KeyspaceName, ScopeRequest};
use cassnap_store::archive::{
    extract_schemas, keyspace_schema_member, pack_schemas, RING_FILE, SCHEMAS_DIR, SCHEMAS_ZIP,
    SCHEMA_FILE,
};
use cassnap_store::atomic::atomic_write;
use cassnap_store::errors::io_error;
use cassnap_store::Workspace;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `schema.cql` into `dest` and the per-keyspace DDL into
/// `dest/schemas.zip`, staging the loose files under `staging`
///
/// `schema.cql` holds `DESCRIBE SCHEMA` when `whole_schema`, otherwise the
/// DDL of `keyspaces` only.
pub(crate) fn write_schema_files(
    inspector: &SchemaInspector<'_>,
    host: &str,
    keyspaces: &[KeyspaceName],
    whole_schema: bool,
    dest: &Path,
    staging: &Workspace,
) -> Result<()> {
    let mut combined = String::new();
    for keyspace in keyspaces {
        let ddl = inspector.describe_keyspace(host, keyspace)?;
        let member = staging.member(&keyspace_schema_member(keyspace.as_str()))?;
        fs::write(&member, &ddl).map_err(|e| io_error("write_schema", &member, e))?;
        if !whole_schema {
            combined.push_str(&ddl);
            combined.push('\n');
        }
    }

    let full = if whole_schema {
        inspector.describe_schema(host)?
    } else {
        combined
    };
    atomic_write(&dest.join(SCHEMA_FILE), full.as_bytes())?;
    pack_schemas(staging.root(), &dest.join(SCHEMAS_ZIP))?;
    tracing::debug!(keyspaces = keyspaces.len(), dest = %dest.display(), "Schema written");
    Ok(())
}

pub(crate) fn write_ring_info(ctx: &NodeContext<'_>, dest: &Path) -> Result<()> {
    let ring = ctx.snapshots.ring()?;
    atomic_write(&dest.join(RING_FILE), ring.as_bytes())
}

/// Result of `save_schema`
#[derive(Debug, Clone)]
pub struct SavedSchema {
    pub dest: PathBuf,
    pub keyspaces: Vec<KeyspaceName>,
}

/// Validate `scope`'s keyspaces against the live schema and write their DDL
/// into `dest`
pub fn save_schema(
    ctx: &NodeContext<'_>,
    scope: &ScopeRequest,
    dest: &Path,
    staging_root: &Path,
    include_ring: bool,
) -> Result<SavedSchema> {
    log_op_start!("save_schema", host = ctx.host.as_str());
    let start = std::time::Instant::now();

    let result = save_schema_impl(ctx, scope, dest, staging_root, include_ring).map_err(|e| {
        log_op_error!(
            "save_schema",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "save_schema",
        duration_ms = start.elapsed().as_millis() as u64,
        keyspaces = result.keyspaces.len()
    );
    Ok(result)
}

fn save_schema_impl(
    ctx: &NodeContext<'_>,
    scope: &ScopeRequest,
    dest: &Path,
    staging_root: &Path,
    include_ring: bool,
) -> Result<SavedSchema> {
    let inspector = ctx.inspector();
    inspector.ensure_reachable(&ctx.host)?;

    let live = inspector.live_schema(&ctx.host)?;
    let resolved = ScopeRequest {
        keyspaces: scope.keyspaces.clone(),
        tables: Vec::new(),
    }
    .resolve(&live)?;
    let keyspaces: Vec<KeyspaceName> = resolved.into_keys().collect();

    fs::create_dir_all(dest).map_err(|e| io_error("save_schema", dest, e))?;
    let staging = Workspace::prepare(staging_root)?;
    write_schema_files(
        &inspector,
        &ctx.host,
        &keyspaces,
        scope.keyspaces.is_empty(),
        dest,
        &staging,
    )?;
    staging.discard()?;

    if include_ring {
        write_ring_info(ctx, dest)?;
    }

    Ok(SavedSchema {
        dest: dest.to_path_buf(),
        keyspaces,
    })
}

/// DDL files to replay for a keyspace selection
///
/// With no keyspaces the full `schema.cql` is used; otherwise each
/// keyspace's own file from the expanded `schemas.zip`, once per keyspace.
/// Every file is checked for existence before any is returned.
pub(crate) fn ddl_files(root: &Path, keyspaces: &[KeyspaceName]) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = if keyspaces.is_empty() {
        vec![root.join(SCHEMA_FILE)]
    } else {
        unique(keyspaces)
            .into_iter()
            .map(|k| root.join(SCHEMAS_DIR).join(keyspace_schema_member(k.as_str())))
            .collect()
    };

    for file in &files {
        if !file.is_file() {
            return Err(ExError::new(ExErrorKind::Validation)
                .with_op("ddl_files")
                .with_subject(file.display().to_string())
                .with_message("Schema file missing from archive"));
        }
    }
    Ok(files)
}

/// Execute DDL files in order against `host`
pub(crate) fn replay_ddl(ctx: &NodeContext<'_>, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let ddl = fs::read_to_string(file).map_err(|e| io_error("replay_ddl", file, e))?;
        tracing::info!(file = %file.display(), "Replaying schema");
        ctx.cql.query(&ctx.host, &ddl)?;
    }
    Ok(())
}

/// Replay the DDL found under `source` (a directory holding `schema.cql`
/// and `schemas.zip`)
pub fn load_schema(ctx: &NodeContext<'_>, source: &Path, keyspaces: &[KeyspaceName]) -> Result<usize> {
    log_op_start!("load_schema", host = ctx.host.as_str());
    let start = std::time::Instant::now();

    let result = load_schema_impl(ctx, source, keyspaces).map_err(|e| {
        log_op_error!(
            "load_schema",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "load_schema",
        duration_ms = start.elapsed().as_millis() as u64,
        files = result
    );
    Ok(result)
}

fn load_schema_impl(ctx: &NodeContext<'_>, source: &Path, keyspaces: &[KeyspaceName]) -> Result<usize> {
    if !source.join(SCHEMAS_DIR).is_dir() {
        extract_schemas(source)?;
    }
    let files = ddl_files(source, keyspaces)?;
    for keyspace in keyspaces {
        if keyspace.is_system() {
            return Err(SnapError::InvalidIdentifier {
                what: "non-system keyspace",
                value: keyspace.to_string(),
            }
            .into());
        }
    }
    ctx.inspector().ensure_reachable(&ctx.host)?;
    replay_ddl(ctx, &files)?;
    Ok(files.len())
}
