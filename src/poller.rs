//! Poller - executes one device's full query set
//!
//! One poll is the atomic unit of work: every metric column of the device's
//! profile is walked, and only a fully successful pass yields a
//! [`Snapshot`]. The first device-fatal transport error aborts the rest of
//! the queries for this cycle (fail-fast per device, not per metric) and
//! yields a [`QueryFailure`] instead - partial results are discarded so the
//! diff engine never sees an incomplete baseline.
//!
//! There are no retries here. Retry policy is the scheduler's next cadence
//! tick, which bounds worst-case poll latency to one timeout budget per
//! query.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use crate::transport::{QueryTransport, RowValue, TransportError};
use crate::{DeviceIdentity, MetricQuery, Snapshot};

/// Produced instead of a snapshot when any query of the device's set hits a
/// device-fatal transport error.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub identity: DeviceIdentity,
    pub cause: TransportError,
    pub timestamp: DateTime<Utc>,
}

pub struct Poller {
    transport: Arc<dyn QueryTransport>,
    query_timeout: Duration,
}

impl Poller {
    pub fn new(transport: Arc<dyn QueryTransport>, query_timeout: Duration) -> Self {
        Self {
            transport,
            query_timeout,
        }
    }

    /// Poll one device for its full query set.
    ///
    /// Columns are walked sequentially in query order and zipped
    /// positionally into rows. Rows the device answered with a per-row
    /// protocol error are skipped within their column; a column shorter
    /// than the longest simply leaves that metric absent from tail rows.
    #[instrument(skip_all, fields(device = %identity))]
    pub async fn poll(
        &self,
        identity: &DeviceIdentity,
        queries: &[MetricQuery],
    ) -> Result<Snapshot, QueryFailure> {
        let mut columns: Vec<(String, Vec<String>)> = Vec::with_capacity(queries.len());

        for query in queries {
            let rows = self
                .transport
                .walk(&identity.address, &query.oid, self.query_timeout)
                .await
                .map_err(|cause| QueryFailure {
                    identity: identity.clone(),
                    cause,
                    timestamp: Utc::now(),
                })?;

            let values: Vec<String> = rows
                .into_iter()
                .filter_map(|(index, value)| match value {
                    RowValue::Value(v) => Some(v),
                    RowValue::Missing => {
                        trace!("{}: no value at index {index} for {}", identity, query.name);
                        None
                    }
                })
                .collect();

            trace!("{}: {} returned {} values", identity, query.name, values.len());
            columns.push((query.name.clone(), values));
        }

        let row_count = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut rows: Vec<HashMap<String, String>> = Vec::with_capacity(row_count);
        for i in 0..row_count {
            let row = columns
                .iter()
                .filter_map(|(name, values)| values.get(i).map(|v| (name.clone(), v.clone())))
                .collect();
            rows.push(row);
        }

        Ok(Snapshot {
            identity: identity.clone(),
            captured_at: Utc::now(),
            columns: queries.iter().map(|q| q.name.clone()).collect(),
            rows,
        })
    }
}
