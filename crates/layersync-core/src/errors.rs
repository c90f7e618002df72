//! Canonical error facility for LayerSync.
//!
//! Every fault in the system is a [`SyncError`]: a structured value carrying
//! an error kind, a stable code, and optional context (operation, field name,
//! record key, storage detail messages). Configuration-time errors are raised
//! to the caller; update-time errors are converted into failure report text
//! by the update executor and never propagate as raised faults.

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling
/// and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Invalid or missing input: absent dataset, key field missing from a
    /// schema. Surfaced before any analysis begins.
    Configuration,
    /// The shared dataset could not enter edit mode.
    EditSession,
    /// The storage layer rejected the session commit.
    Commit,
    /// Any other fault during the update phase. Triggers rollback.
    Unexpected,
    /// Cooperative cancellation was requested at a phase boundary.
    Canceled,

    // Integration/IO
    Io,
    Persistence,
    Serialization,
    InvalidGeometry,

    // Internal
    Internal,
}

impl SyncErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            SyncErrorKind::Configuration => "ERR_CONFIGURATION",
            SyncErrorKind::EditSession => "ERR_EDIT_SESSION",
            SyncErrorKind::Commit => "ERR_COMMIT",
            SyncErrorKind::Unexpected => "ERR_UNEXPECTED",
            SyncErrorKind::Canceled => "ERR_CANCELED",
            SyncErrorKind::Io => "ERR_IO",
            SyncErrorKind::Persistence => "ERR_PERSISTENCE",
            SyncErrorKind::Serialization => "ERR_SERIALIZATION",
            SyncErrorKind::InvalidGeometry => "ERR_INVALID_GEOMETRY",
            SyncErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification lives in [`SyncErrorKind`]; the remaining fields carry
/// context for debugging and for rendering into report text.
#[derive(Debug, Clone)]
pub struct SyncError {
    kind: SyncErrorKind,
    op: Option<String>,
    field: Option<String>,
    key: Option<String>,
    message: String,
    /// Detail messages reported by the storage layer (commit rejections can
    /// carry more than one).
    details: Vec<String>,
    source: Option<Box<SyncError>>,
}

impl SyncError {
    /// Create a new error with the specified kind
    pub fn new(kind: SyncErrorKind) -> Self {
        Self {
            kind,
            op: None,
            field: None,
            key: None,
            message: String::new(),
            details: Vec::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add field name context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add record key context
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add storage detail messages
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: SyncError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> SyncErrorKind {
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

    /// Get the field name context, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the record key context, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the storage detail messages
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&SyncError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if !self.details.is_empty() {
            write!(f, ": {}", self.details.join("; "))?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
