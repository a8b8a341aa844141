//! SNMP v2c query transport
//!
//! Walks one OID subtree per metric with iterated GETBULK requests. A fresh
//! session is opened per walk; SNMP is UDP-based, so sessions are cheap and
//! keeping none avoids stale sockets across slow cycles.

use std::time::Duration;

use async_trait::async_trait;
use snmp2::{AsyncSession, Oid, Value};
use tracing::trace;

use super::error::{TransportError, TransportResult};
use super::{QueryTransport, RowValue};

/// Values fetched per GETBULK round trip.
const MAX_REPETITIONS: u32 = 10;

/// Default SNMP agent port, appended when the address carries none.
const SNMP_PORT: u16 = 161;

/// SNMP v2c implementation of [`QueryTransport`].
pub struct SnmpTransport {
    community: Vec<u8>,
}

impl SnmpTransport {
    pub fn new(community: impl Into<Vec<u8>>) -> Self {
        Self {
            community: community.into(),
        }
    }

    async fn walk_subtree(
        &self,
        address: &str,
        oid: &str,
    ) -> TransportResult<Vec<(u32, RowValue)>> {
        let root = parse_oid(oid)?;
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{address}:{SNMP_PORT}")
        };

        let mut session = AsyncSession::new_v2c(&target, &self.community, 0)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let mut results: Vec<(u32, RowValue)> = Vec::new();
        let mut current_oid = root.to_owned();

        loop {
            let resp = session
                .getbulk(&[&current_oid], 0, MAX_REPETITIONS)
                .await
                .map_err(|e| TransportError::Unreachable(e.to_string()))?;

            let mut items = Vec::new();
            let mut found_any = false;

            for (oid, value) in resp.varbinds {
                if !oid.starts_with(&root) {
                    results.extend(items);
                    return Ok(results);
                }

                let index = row_index(&oid).unwrap_or(results.len() as u32 + items.len() as u32);
                items.push((index, render_value(&value)));
                current_oid = oid.to_owned();
                found_any = true;
            }

            if !found_any {
                break;
            }

            results.extend(items);
        }

        Ok(results)
    }
}

#[async_trait]
impl QueryTransport for SnmpTransport {
    async fn walk(
        &self,
        address: &str,
        oid: &str,
        timeout: Duration,
    ) -> TransportResult<Vec<(u32, RowValue)>> {
        trace!("walking {oid} on {address}");

        match tokio::time::timeout(timeout, self.walk_subtree(address, oid)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

/// Parse a dotted-decimal OID string.
fn parse_oid(s: &str) -> TransportResult<Oid<'static>> {
    let parts: Result<Vec<u64>, _> = s
        .trim()
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>())
        .collect();

    let parts = parts.map_err(|_| TransportError::Malformed(format!("invalid OID: {s}")))?;
    Oid::from(&parts).map_err(|e| TransportError::Malformed(format!("invalid OID {s}: {e:?}")))
}

/// Row index of a response varbind: the last sub-identifier of its OID.
fn row_index(oid: &Oid<'_>) -> Option<u32> {
    oid.to_string().rsplit('.').next()?.parse().ok()
}

/// Render a wire value to the opaque string form the diff engine compares.
/// Integer-family values keep their decimal encoding (ifOperStatus arrives
/// as "1"/"2"); per-row protocol exceptions become `Missing`.
fn render_value(value: &Value<'_>) -> RowValue {
    match value {
        Value::Integer(i) => RowValue::Value(i.to_string()),
        Value::OctetString(bytes) => {
            RowValue::Value(String::from_utf8_lossy(bytes).into_owned())
        }
        Value::Counter32(n) => RowValue::Value(n.to_string()),
        Value::Unsigned32(n) => RowValue::Value(n.to_string()),
        Value::Timeticks(t) => RowValue::Value(t.to_string()),
        Value::Counter64(n) => RowValue::Value(n.to_string()),
        Value::ObjectIdentifier(oid) => RowValue::Value(oid.to_string()),
        Value::Null => RowValue::Value(String::new()),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => RowValue::Missing,
        other => RowValue::Value(format!("{other:?}")),
    }
}
