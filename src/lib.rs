pub mod config;
pub mod diff;
pub mod dispatch;
pub mod poller;
pub mod scheduler;
pub mod sinks;
pub mod store;
pub mod transport;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one polled device: its configured type label plus its
/// network address. Used as the key for the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_type: String,
    pub address: String,
}

impl DeviceIdentity {
    pub fn new(device_type: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            address: address.into(),
        }
    }

    /// Stable key used for store lookups, log fields and artifact names.
    pub fn key(&self) -> String {
        format!("{}_{}", self.device_type, self.address)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.device_type, self.address)
    }
}

/// One named metric column to fetch from a device, addressed by OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub name: String,
    pub oid: String,
}

impl MetricQuery {
    pub fn new(name: impl Into<String>, oid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oid: oid.into(),
        }
    }
}

/// The complete, successful result of polling one device once.
///
/// Rows are ordered by the position the device returned them in; each row
/// maps metric name to the value's wire encoding rendered as a string.
/// A snapshot is never mutated - the next successful poll supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub identity: DeviceIdentity,
    pub captured_at: DateTime<Utc>,
    /// Metric names in configured query order, for stable column rendering.
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl Snapshot {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Value of `metric` in row `row`, if both exist.
    pub fn value(&self, row: usize, metric: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(metric))
            .map(String::as_str)
    }
}

/// Per-device work unit handed to the poller: the device plus the query
/// set of its profile, shared read-only across all poll cycles.
#[derive(Debug, Clone)]
pub struct DeviceAssignment {
    pub identity: DeviceIdentity,
    pub queries: Arc<[MetricQuery]>,
}
