//! Error types for sink operations

use std::fmt;

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while delivering an alert or writing an artifact
#[derive(Debug)]
pub enum SinkError {
    /// Artifact file could not be written
    Io(std::io::Error),

    /// Webhook delivery failed (connection error or non-success status)
    Http(String),

    /// Payload could not be serialized
    Serialization(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(err) => write!(f, "I/O error: {}", err),
            SinkError::Http(msg) => write!(f, "HTTP delivery failed: {}", msg),
            SinkError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Http(err.to_string())
    }
}
