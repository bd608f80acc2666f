use std::fmt;

use thiserror::Error;

/// A native error reported by a database backend.
///
/// `code` carries the backend's own error identifier (a SQLSTATE for
/// PostgreSQL) and is what connect-retry classification looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Error type for dbrs operations
#[derive(Debug, Error)]
pub enum DbRsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection to `{driver}` could not be established: {reason}")]
    Connection {
        driver: String,
        reason: String,
        #[source]
        source: BackendError,
    },

    #[error("Query failed: {0}")]
    Execution(#[from] BackendError),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

impl DbRsError {
    pub fn configuration(message: impl Into<String>) -> Self {
        DbRsError::Configuration(message.into())
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        DbRsError::Conversion(message.into())
    }

    /// Native error code of the underlying backend failure, if any.
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            DbRsError::Connection { source, .. } | DbRsError::Execution(source) => {
                source.code.as_deref()
            }
            _ => None,
        }
    }
}

/// Result type alias for dbrs operations
pub type Result<T> = std::result::Result<T, DbRsError>;
