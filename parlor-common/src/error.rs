//! Error types for Parlor services.

use thiserror::Error;

/// Unified error type for Parlor services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Quota of the upstream generator exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::QuotaExceeded(_) => 429,
            Self::Timeout => 504,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}
