//! Error types and Result aliases for partitionby

use std::fmt;

// ============================================================================
// Error Codes
// ============================================================================

/// Classification of failures reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Column indexes, directions or dataset shape are inconsistent
    InvalidSpecification,
    /// A window function produced the wrong number of rows for a partition
    ShapeMismatch,
    /// Execution settings are unusable (e.g. zero worker threads)
    Misuse,
}

impl ErrorCode {
    /// Static description of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidSpecification => "invalid specification",
            ErrorCode::ShapeMismatch => "shape mismatch",
            ErrorCode::Misuse => "invalid execution settings",
        }
    }
}

// ============================================================================
// Error
// ============================================================================

/// Error returned by every fallible operation in the crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// What kind of failure this is
    pub code: ErrorCode,
    /// Detail for the caller, if any
    pub message: Option<String>,
}

impl Error {
    /// Create an error with only a code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Create an error with a code and a message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// The error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.code.as_str(), msg),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for partitionby operations
pub type Result<T> = std::result::Result<T, Error>;
