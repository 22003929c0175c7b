//! Command orchestration layer.
//!
//! ## Logging Ownership
//!
//! Each public command owns its lifecycle logging (`log_op_start!`,
//! `log_op_end!`, `log_op_error!`). Lower layers use `tracing::debug!` or
//! `tracing::warn!` for details only.

pub mod clean;
pub mod cluster;
pub mod load;
pub mod reset;
pub mod restore;
pub mod schema;
pub mod snapshot;
