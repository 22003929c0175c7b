use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used by the CLI, by tests and in
/// the `err.code` log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Requested keyspace/table outside the target authority, or an illegal
    /// filter combination
    Validation,
    /// Destination archive or remote key already exists
    Collision,
    /// Host unreachable or failing a basic health query
    Connectivity,
    /// Query output or DDL text does not have the expected shape
    SchemaParse,
    /// Aggregate remote job returned non-zero
    OrchestrationFailure,
    /// Schema already dropped but restore not completed
    IrreversibleState,

    // Ambient
    NotFound,
    Timeout,
    Config,
    Io,
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::Collision => "ERR_COLLISION",
            ExErrorKind::Connectivity => "ERR_CONNECTIVITY",
            ExErrorKind::SchemaParse => "ERR_SCHEMA_PARSE",
            ExErrorKind::OrchestrationFailure => "ERR_ORCHESTRATION_FAILURE",
            ExErrorKind::IrreversibleState => "ERR_IRREVERSIBLE_STATE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// `subject` names the offending identifier (keyspace, table, archive path,
/// remote key, host). `stage` is only set on irreversible failures and names
/// the restore step that was reached.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    subject: Option<String>,
    stage: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            subject: None,
            stage: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the offending identifier
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add the stage reached
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the offending identifier, if any
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Get the stage reached, if any
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(subject) = &self.subject {
            write!(f, " (subject: {})", subject)?;
        }
        if let Some(stage) = &self.stage {
            write!(f, " (stage: {})", stage)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures of the snapshot/restore engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapError {
    /// Text is not a legal CQL identifier
    #[error("Invalid {what} name: '{value}'")]
    InvalidIdentifier { what: &'static str, value: String },

    /// Keyspace is not part of the target authority's schema
    #[error("Keyspace \"{keyspace}\" not found in {authority}")]
    KeyspaceNotFound { keyspace: String, authority: String },

    /// Table is not part of the keyspace in the target authority's schema
    #[error("Table \"{table}\" not found in keyspace \"{keyspace}\" of {authority}")]
    TableNotFound {
        keyspace: String,
        table: String,
        authority: String,
    },

    /// A table filter was combined with zero or several keyspaces
    #[error("Exactly one keyspace must be specified with a table filter (got {keyspaces})")]
    TablesNeedOneKeyspace { keyspaces: usize },

    /// Snapshot title cannot be used as an archive file name
    #[error("Invalid snapshot title '{title}': {reason}")]
    InvalidTitle { title: String, reason: String },

    /// Nothing to snapshot on the host
    #[error("No keyspaces to snapshot on {host}")]
    NoKeyspaces { host: String },

    /// Destination archive already exists
    #[error("Archive already exists: {path}")]
    ArchiveExists { path: String },

    /// Remote key already exists
    #[error("Remote archive already exists: {key}")]
    RemoteKeyExists { key: String },

    /// Remote key not present in the store listing
    #[error("Remote archive not found: {key}")]
    RemoteKeyNotFound { key: String },

    /// Exactly one archive source must be given
    #[error("Exactly one archive source must be specified: {reason}")]
    ArchiveSource { reason: String },

    /// No hosts given and none configured
    #[error("No hosts specified and none configured")]
    NoHosts,

    /// Host did not answer a health query
    #[error("Host {host} is not reachable: {reason}")]
    HostUnreachable { host: String, reason: String },

    /// Collaborator output did not have the expected shape
    #[error("Unexpected {what}: {reason}")]
    UnexpectedOutput { what: String, reason: String },

    /// A remote job reported a non-zero aggregate status
    #[error("Remote job '{job}' failed with status {status}")]
    JobFailed { job: String, status: i32 },

    /// A restore step failed after the schema had been dropped
    #[error("Restore stopped at stage '{stage}' after existing keyspaces were dropped: {reason}")]
    Irreversible { stage: String, reason: String },

    /// Service did not become ready in time
    #[error("Timed out after {waited_secs}s waiting for {host} to become ready")]
    ReadinessTimeout { host: String, waited_secs: u64 },
}

impl From<SnapError> for ExError {
    fn from(err: SnapError) -> Self {
        let message = err.to_string();
        match err {
            SnapError::InvalidIdentifier { value, .. } => ExError::new(ExErrorKind::Validation)
                .with_subject(value)
                .with_message(message),

            SnapError::KeyspaceNotFound { keyspace, .. } => {
                ExError::new(ExErrorKind::Validation)
                    .with_subject(keyspace)
                    .with_message(message)
            }

            SnapError::TableNotFound {
                keyspace, table, ..
            } => ExError::new(ExErrorKind::Validation)
                .with_subject(format!("{}.{}", keyspace, table))
                .with_message(message),

            SnapError::TablesNeedOneKeyspace { .. } => ExError::new(ExErrorKind::Validation)
                .with_op("validate_scope")
                .with_message(message),

            SnapError::InvalidTitle { title, .. } => ExError::new(ExErrorKind::Validation)
                .with_subject(title)
                .with_message(message),

            SnapError::NoKeyspaces { host } => ExError::new(ExErrorKind::Validation)
                .with_subject(host)
                .with_message(message),

            SnapError::ArchiveExists { path } => ExError::new(ExErrorKind::Collision)
                .with_subject(path)
                .with_message(message),

            SnapError::RemoteKeyExists { key } => ExError::new(ExErrorKind::Collision)
                .with_subject(key)
                .with_message(message),

            SnapError::RemoteKeyNotFound { key } => ExError::new(ExErrorKind::NotFound)
                .with_subject(key)
                .with_message(message),

            SnapError::ArchiveSource { .. } => ExError::new(ExErrorKind::Validation)
                .with_op("resolve_archive_source")
                .with_message(message),

            SnapError::NoHosts => ExError::new(ExErrorKind::Validation)
                .with_op("resolve_hosts")
                .with_message(message),

            SnapError::HostUnreachable { host, .. } => ExError::new(ExErrorKind::Connectivity)
                .with_subject(host)
                .with_message(message),

            SnapError::UnexpectedOutput { .. } => {
                ExError::new(ExErrorKind::SchemaParse).with_message(message)
            }

            SnapError::JobFailed { job, .. } => ExError::new(ExErrorKind::OrchestrationFailure)
                .with_subject(job)
                .with_message(message),

            SnapError::Irreversible { stage, .. } => {
                ExError::new(ExErrorKind::IrreversibleState)
                    .with_stage(stage)
                    .with_message(message)
            }

            SnapError::ReadinessTimeout { host, .. } => ExError::new(ExErrorKind::Timeout)
                .with_subject(host)
                .with_message(message),
        }
    }
}
