//! Orphaned directory cleanup
//!
//! Planning is pure (`cassnap_core::reconcile::plan`); this module scans,
//! asks, and applies.

#![allow(clippy::result_large_err)]

use crate::context::NodeContext;
use cassnap_core::errors::Result;
use cassnap_core::reconcile::{plan, ReconcilePlan};
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_store::reconcile_fs::{apply_plan, scan_layout};

/// Plan against the full live schema (system keyspaces included)
fn plan_for(ctx: &NodeContext<'_>, purge_backups: bool) -> Result<ReconcilePlan> {
    let inspector = ctx.inspector();
    inspector.ensure_reachable(&ctx.host)?;
    let live = inspector.full_schema(&ctx.host)?;
    let layout = scan_layout(&ctx.data_dir, &live, purge_backups)?;
    plan(&layout, &live, purge_backups)
}

/// Delete every orphaned entry under the data directory without asking
///
/// Returns the number of entries removed. Used by restore after its own
/// confirmation.
pub fn reconcile_directories(ctx: &NodeContext<'_>, purge_backups: bool) -> Result<usize> {
    log_op_start!("reconcile_directories", host = ctx.host.as_str());
    let start = std::time::Instant::now();

    let removed = plan_for(ctx, purge_backups)
        .and_then(|p| apply_plan(&ctx.data_dir, &p))
        .map_err(|e| {
            log_op_error!(
                "reconcile_directories",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    log_op_end!(
        "reconcile_directories",
        duration_ms = start.elapsed().as_millis() as u64,
        removed = removed
    );
    Ok(removed)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanRequest {
    /// Also delete backup artifacts of live tables
    pub purge_backups: bool,
    /// Skip the confirmation
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    Cleaned { removed: usize },
    Declined { planned: usize },
}

/// Standalone cleanup: reconcile, then clear node snapshots
pub fn clean(ctx: &NodeContext<'_>, request: CleanRequest) -> Result<CleanOutcome> {
    log_op_start!("clean", host = ctx.host.as_str());
    let start = std::time::Instant::now();

    let outcome = clean_impl(ctx, request).map_err(|e| {
        log_op_error!(
            "clean",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!("clean", duration_ms = start.elapsed().as_millis() as u64);
    Ok(outcome)
}

fn clean_impl(ctx: &NodeContext<'_>, request: CleanRequest) -> Result<CleanOutcome> {
    let planned = plan_for(ctx, request.purge_backups)?;

    if !planned.is_empty() && !request.force {
        for removal in &planned.removals {
            tracing::info!(entry = %removal, "Planned removal");
        }
        let question = format!(
            "Delete {} orphaned entries under {}?",
            planned.len(),
            ctx.data_dir.display()
        );
        if !ctx.prompt.confirm(&question)? {
            return Ok(CleanOutcome::Declined {
                planned: planned.len(),
            });
        }
    }

    let removed = apply_plan(&ctx.data_dir, &planned)?;
    ctx.snapshots.clear_snapshots()?;
    Ok(CleanOutcome::Cleaned { removed })
}
