//! Structured logging facility for cassnap
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - A root span per run carrying the `RunId`
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use cassnap_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use cassnap_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
pub use init::{init, run_span, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
