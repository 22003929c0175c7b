//! Restore coordination
//!
//! ## Steps
//!
//! 1. Validate the scope against the archive schema
//! 2. Confirm (unless forced)
//! 3. `drop_keyspaces`: drop every non-system keyspace
//! 4. `reconcile`: delete orphaned directories
//! 5. `recreate_schema`: replay archived DDL
//! 6. `verify_schema`: every table to load must exist live
//! 7. `bulk_load`: one loader run per table with a payload
//!
//! Nothing is mutated before step 3. A failure from step 3 on is reported as
//! `IrreversibleState` naming the stage; there is no rollback.

#![allow(clippy::result_large_err)]

use super::clean::reconcile_directories;
use super::load::LoadedArchive;
use super::schema::{ddl_files, replay_ddl};
use crate::context::NodeContext;
use cassnap_core::collaborators::BulkLoader;
use cassnap_core::errors::{ExError, Result, SnapError};
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::{KeyspaceName, ScopeRequest, TableName};

pub const STAGE_DROP: &str = "drop_keyspaces";
pub const STAGE_RECONCILE: &str = "reconcile";
pub const STAGE_RECREATE: &str = "recreate_schema";
pub const STAGE_VERIFY: &str = "verify_schema";
pub const STAGE_LOAD: &str = "bulk_load";

#[derive(Debug, Clone, Default)]
pub struct RestoreRequest {
    pub scope: ScopeRequest,
    /// Skip the confirmation
    pub force: bool,
    /// Hosts handed to the bulk loader; empty means the context host
    pub load_hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub dropped: Vec<KeyspaceName>,
    pub reconciled: usize,
    pub loaded: Vec<(KeyspaceName, TableName)>,
    /// Recreated from DDL but with no payload in the archive
    pub schema_only: Vec<(KeyspaceName, TableName)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Declined,
    Restored(RestoreReport),
}

fn irreversible(stage: &str, err: ExError) -> ExError {
    ExError::from(SnapError::Irreversible {
        stage: stage.to_string(),
        reason: err.message().to_string(),
    })
    .with_op("restore")
    .with_source(err)
}

/// Replace the node's schema and data with the archive's
///
/// # Errors
///
/// - `Validation` if the scope does not match the archive schema, with no
///   mutation
/// - `Connectivity` if the host does not answer, with no mutation
/// - `IrreversibleState` for any failure after keyspaces were dropped
pub fn restore(
    ctx: &NodeContext<'_>,
    loader: &dyn BulkLoader,
    archive: &LoadedArchive,
    request: &RestoreRequest,
) -> Result<RestoreOutcome> {
    log_op_start!(
        "restore",
        host = ctx.host.as_str(),
        title = archive.title()
    );
    let start = std::time::Instant::now();

    let outcome = restore_impl(ctx, loader, archive, request).map_err(|e| {
        log_op_error!(
            "restore",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "restore",
        duration_ms = start.elapsed().as_millis() as u64,
        declined = matches!(outcome, RestoreOutcome::Declined)
    );
    Ok(outcome)
}

fn restore_impl(
    ctx: &NodeContext<'_>,
    loader: &dyn BulkLoader,
    archive: &LoadedArchive,
    request: &RestoreRequest,
) -> Result<RestoreOutcome> {
    let resolved = request.scope.resolve(archive.archive_schema())?;
    let ddl_keyspaces: Vec<KeyspaceName> = if request.scope.keyspaces.is_empty() {
        Vec::new()
    } else {
        resolved.keys().cloned().collect()
    };
    let ddl = ddl_files(archive.root(), &ddl_keyspaces)?;
    let inspector = ctx.inspector();
    inspector.ensure_reachable(&ctx.host)?;

    if !request.force {
        let question = format!(
            "Restoring '{}' drops every non-system keyspace on {}. Continue?",
            archive.title(),
            ctx.host
        );
        if !ctx.prompt.confirm(&question)? {
            tracing::info!("Restore declined");
            return Ok(RestoreOutcome::Declined);
        }
    }

    let mut report = RestoreReport::default();

    let existing = inspector
        .list_keyspaces(&ctx.host, false)
        .map_err(|e| irreversible(STAGE_DROP, e))?;
    for keyspace in existing {
        tracing::warn!(keyspace = %keyspace, "Dropping keyspace");
        ctx.cql
            .query(&ctx.host, &format!("DROP KEYSPACE {};", keyspace.quoted()))
            .map_err(|e| irreversible(STAGE_DROP, e))?;
        report.dropped.push(keyspace);
    }

    report.reconciled =
        reconcile_directories(ctx, false).map_err(|e| irreversible(STAGE_RECONCILE, e))?;

    replay_ddl(ctx, &ddl).map_err(|e| irreversible(STAGE_RECREATE, e))?;

    let live = inspector
        .directory_structure(&ctx.host, resolved.keys())
        .map_err(|e| irreversible(STAGE_VERIFY, e))?;
    for (keyspace, tables) in &resolved {
        for table in tables {
            if live.directory(keyspace, table).is_none() {
                return Err(SnapError::Irreversible {
                    stage: STAGE_VERIFY.to_string(),
                    reason: format!("table {}.{} missing after schema recreation", keyspace, table),
                }
                .into());
            }
        }
    }

    let hosts = if request.load_hosts.is_empty() {
        vec![ctx.host.clone()]
    } else {
        request.load_hosts.clone()
    };
    let mut failures = Vec::new();
    for (keyspace, tables) in &resolved {
        for table in tables {
            let Some(payload) = archive.payload_dir(keyspace, table) else {
                tracing::info!(keyspace = %keyspace, table = %table, "No payload archived; schema only");
                report.schema_only.push((keyspace.clone(), table.clone()));
                continue;
            };
            let status = loader
                .load(&hosts, &payload)
                .map_err(|e| irreversible(STAGE_LOAD, e))?;
            if status == 0 {
                report.loaded.push((keyspace.clone(), table.clone()));
            } else {
                tracing::warn!(keyspace = %keyspace, table = %table, status = status, "Bulk load failed");
                failures.push(format!("{}.{} (status {})", keyspace, table, status));
            }
        }
    }

    if !failures.is_empty() {
        return Err(ExError::from(SnapError::Irreversible {
            stage: STAGE_LOAD.to_string(),
            reason: format!("bulk load failed for {}", failures.join(", ")),
        })
        .with_op("restore"));
    }

    Ok(RestoreOutcome::Restored(report))
}
