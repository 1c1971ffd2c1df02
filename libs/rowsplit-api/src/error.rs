use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error kind for store and hint-service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity or store-side fault.
    DataAccess,
    Config,
    Io,
    Format,
}

/// Underlying failure kept for diagnostics.
pub type ErrorCause = Arc<dyn Error + Send + Sync>;

/// Collaborator error, returned by every `RecordStore` and `PartitionHint` method.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
    cause: Option<ErrorCause>,
}

impl StoreError {
    fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into(), cause: None }
    }

    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataAccess, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, msg)
    }

    /// Attach the failure this error was raised for.
    pub fn caused_by(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// Add context to the error, preserving the original ErrorKind and cause.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
            cause: self.cause,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// From impls: standard error types → StoreError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string()).caused_by(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string()).caused_by(e)
    }
}
