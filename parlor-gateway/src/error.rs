//! Caller-facing error kinds for session operations.

use serde::Serialize;
use thiserror::Error;

/// Message shown when the generator's daily allowance is used up.
pub const QUOTA_MESSAGE: &str = "Daily AI usage limit reached. Please try again tomorrow.";

/// Message shown when the generator did not answer in time.
pub const TIMEOUT_MESSAGE: &str = "The AI took too long to respond. Please try again.";

/// Message shown for every other failure.
pub const GENERIC_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Classification of a failed session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty or malformed input; nothing was read or written
    Validation,
    /// Remote generation capability exhausted
    Quota,
    /// Remote call exceeded its bound
    Timeout,
    /// Unclassified remote failure or persistence failure
    Other,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Quota => "quota",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed session operation, already phrased for the caller.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A failure whose details stay in the logs.
    pub fn other() -> Self {
        Self::new(ErrorKind::Other, GENERIC_MESSAGE)
    }
}

impl From<SessionError> for parlor_common::Error {
    fn from(err: SessionError) -> Self {
        match err.kind {
            ErrorKind::Validation => Self::InvalidInput(err.message),
            ErrorKind::Quota => Self::QuotaExceeded(err.message),
            ErrorKind::Timeout => Self::Timeout,
            ErrorKind::Other => Self::Internal(err.message),
        }
    }
}
