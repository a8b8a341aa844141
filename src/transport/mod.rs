//! Device query transports
//!
//! The poller talks to devices through the [`QueryTransport`] trait, so the
//! protocol plumbing stays swappable and tests can script device behavior
//! without a network. The shipped implementation is SNMP v2c
//! ([`snmp::SnmpTransport`]).
//!
//! ## Error model
//!
//! - **Device-fatal** conditions (unreachable, timeout, undecodable
//!   response) are [`TransportError`] values and abort the device's poll
//!   for the cycle.
//! - **Row-level** protocol conditions (noSuchObject, noSuchInstance,
//!   endOfMibView) are [`RowValue::Missing`] and only skip that row.

pub mod error;
pub mod snmp;

pub use error::{TransportError, TransportResult};
pub use snmp::SnmpTransport;

use std::time::Duration;

use async_trait::async_trait;

/// One cell of a walked metric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowValue {
    /// The device returned a value; wire encoding rendered as a string.
    Value(String),

    /// The device answered with a per-row protocol error for this position.
    /// The row is skipped, the query as a whole still succeeds.
    Missing,
}

/// Request/response exchange with a device for one metric column.
///
/// Implementations must be `Send + Sync`; the scheduler shares one
/// transport across all concurrent device polls.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Walk the subtree under `oid` on the device at `address`, returning
    /// `(index, value)` pairs in the order the device yields them. The
    /// whole exchange is bounded by `timeout`.
    async fn walk(
        &self,
        address: &str,
        oid: &str,
        timeout: Duration,
    ) -> TransportResult<Vec<(u32, RowValue)>>;
}
