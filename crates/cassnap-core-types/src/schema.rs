//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Cluster and schema identifiers
pub const FIELD_HOST: &str = "host";
pub const FIELD_KEYSPACE: &str = "keyspace";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_ARCHIVE: &str = "archive";
pub const FIELD_STAGE: &str = "stage";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";
pub const FIELD_ERR_SUBJECT: &str = "err.subject";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
