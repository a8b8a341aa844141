//! Error types for device query transports

use std::fmt;
use std::time::Duration;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Device-fatal transport errors.
///
/// Any of these aborts the whole poll of the affected device for the
/// current cycle. Per-row protocol errors (noSuchObject and friends) are
/// not errors at this level - they surface as `RowValue::Missing` and
/// only skip the affected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device could not be reached at all (session setup, send failure)
    Unreachable(String),

    /// No response within the per-query budget
    Timeout(Duration),

    /// A response arrived but could not be decoded
    Malformed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unreachable(msg) => write!(f, "device unreachable: {}", msg),
            TransportError::Timeout(after) => {
                write!(f, "query timed out after {}s", after.as_secs())
            }
            TransportError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
