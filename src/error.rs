//! Error types for the Sift investigation engine
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Sift operations
#[derive(Error, Debug)]
pub enum SiftError {
    /// Embedded database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Log or trace backend returned a non-success status or timed out
    #[error("Backend error: {0}")]
    Backend(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Investigation not found
    #[error("Investigation not found: {0}")]
    InvestigationNotFound(String),

    /// Invalid investigation state transition (e.g., re-running a terminal investigation)
    #[error("Invalid state: investigation {id} is {status}, expected pending")]
    InvalidState { id: String, status: String },

    /// Invalid investigation ID format
    #[error("Invalid investigation ID: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

impl From<rusqlite::Error> for SiftError {
    fn from(err: rusqlite::Error) -> Self {
        SiftError::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SiftError {
    fn from(err: anyhow::Error) -> Self {
        SiftError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiftError::InvestigationNotFound("test-id".to_string());
        assert_eq!(err.to_string(), "Investigation not found: test-id");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = SiftError::InvalidState {
            id: "abc".to_string(),
            status: "completed".to_string(),
        };
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_error_conversion() {
        let uuid_err = uuid::Uuid::parse_str("invalid");
        assert!(uuid_err.is_err());

        let sift_err: SiftError = uuid_err.unwrap_err().into();
        assert!(matches!(sift_err, SiftError::InvalidId(_)));
    }
}
