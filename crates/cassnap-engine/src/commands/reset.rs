//! Hard reset of the local node
//!
//! `shutdown` stops the service and wipes its state directories; `start`
//! starts it and waits until it answers queries. Directories are emptied,
//! not removed, so their ownership and permissions survive.

#![allow(clippy::result_large_err)]

use cassnap_core::collaborators::{CqlClient, ServiceControl};
use cassnap_core::errors::{Result, SnapError};
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::OperatorPrompt;
use cassnap_store::workspace::clear_dir;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStage {
    Shutdown,
    Start,
    All,
}

impl ResetStage {
    fn shuts_down(self) -> bool {
        matches!(self, ResetStage::Shutdown | ResetStage::All)
    }

    fn starts(self) -> bool {
        matches!(self, ResetStage::Start | ResetStage::All)
    }
}

/// How long to wait for the service after starting it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResetRequest {
    pub stage: ResetStage,
    pub force: bool,
    /// Emptied during shutdown
    pub directories: Vec<PathBuf>,
    pub readiness: ReadinessPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Declined,
    Done { wiped: usize, ready_after: Option<Duration> },
}

/// Ping `host` until it answers or the policy's timeout passes
pub fn wait_until_ready(cql: &dyn CqlClient, host: &str, policy: ReadinessPolicy) -> Result<Duration> {
    let start = Instant::now();
    loop {
        match cql.ping(host) {
            Ok(()) => return Ok(start.elapsed()),
            Err(e) => tracing::debug!(host = host, error = %e, "Not ready yet"),
        }
        if start.elapsed() >= policy.timeout {
            return Err(SnapError::ReadinessTimeout {
                host: host.to_string(),
                waited_secs: start.elapsed().as_secs(),
            }
            .into());
        }
        std::thread::sleep(policy.interval);
    }
}

/// Stop, wipe and/or restart the local node
pub fn hard_reset(
    service: &dyn ServiceControl,
    cql: &dyn CqlClient,
    host: &str,
    prompt: &dyn OperatorPrompt,
    request: &ResetRequest,
) -> Result<ResetOutcome> {
    log_op_start!("hard_reset", host = host);
    let start = Instant::now();

    let outcome = hard_reset_impl(service, cql, host, prompt, request).map_err(|e| {
        log_op_error!(
            "hard_reset",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!("hard_reset", duration_ms = start.elapsed().as_millis() as u64);
    Ok(outcome)
}

fn hard_reset_impl(
    service: &dyn ServiceControl,
    cql: &dyn CqlClient,
    host: &str,
    prompt: &dyn OperatorPrompt,
    request: &ResetRequest,
) -> Result<ResetOutcome> {
    if request.stage.shuts_down() && !request.force {
        let listed: Vec<String> = request
            .directories
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        let question = format!(
            "Stop the database on {} and erase {}?",
            host,
            listed.join(", ")
        );
        if !prompt.confirm(&question)? {
            return Ok(ResetOutcome::Declined);
        }
    }

    let mut wiped = 0;
    if request.stage.shuts_down() {
        tracing::warn!(host = host, "Stopping database service");
        service.stop()?;
        for dir in &request.directories {
            if dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "Erasing directory");
                clear_dir(dir)?;
                wiped += 1;
            }
        }
    }

    let mut ready_after = None;
    if request.stage.starts() {
        service.start()?;
        ready_after = Some(wait_until_ready(cql, host, request.readiness)?);
    }

    Ok(ResetOutcome::Done { wiped, ready_after })
}
