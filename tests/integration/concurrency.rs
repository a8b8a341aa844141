//! Concurrency behavior of the scheduler fan-out
//!
//! - the worker budget actually bounds in-flight polls
//! - devices beyond the budget queue instead of being skipped
//! - overlapping cycles for one device serialize on its store entry

use crate::helpers::*;
use async_trait::async_trait;
use linkwatch::dispatch::{AlertDispatchHandle, ReactionDispatcher};
use linkwatch::scheduler::{SchedulerHandle, SchedulerOptions};
use linkwatch::store::SnapshotStore;
use linkwatch::transport::{QueryTransport, RowValue, TransportResult};
use linkwatch::{DeviceAssignment, DeviceIdentity, MetricQuery};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Transport that tracks how many walks are in flight at once.
struct GaugeTransport {
    current: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl GaugeTransport {
    fn new(delay: Duration) -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl QueryTransport for GaugeTransport {
    async fn walk(
        &self,
        _address: &str,
        _oid: &str,
        _timeout: Duration,
    ) -> TransportResult<Vec<(u32, RowValue)>> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![(1, RowValue::Value("1".to_string()))])
    }
}

/// Transport whose status column flips once: first walk "2", then "1".
/// Every walk is slow, so cycles overlap under a short cadence.
struct SlowFlipTransport {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl QueryTransport for SlowFlipTransport {
    async fn walk(
        &self,
        _address: &str,
        _oid: &str,
        _timeout: Duration,
    ) -> TransportResult<Vec<(u32, RowValue)>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let status = if call == 0 { "2" } else { "1" };
        Ok(vec![(1, RowValue::Value(status.to_string()))])
    }
}

fn status_only(address: &str) -> DeviceAssignment {
    DeviceAssignment {
        identity: DeviceIdentity::new("OmniSwitch", address),
        queries: vec![MetricQuery::new("ifOperStatus", STATUS_OID)].into(),
    }
}

fn options(cadence: Duration, workers: usize) -> SchedulerOptions {
    SchedulerOptions {
        cadence,
        workers,
        query_timeout: Duration::from_secs(5),
        status_metric: "ifOperStatus".to_string(),
    }
}

struct Pipeline {
    store: Arc<SnapshotStore>,
    alert_sink: Arc<RecordingAlertSink>,
    scheduler: SchedulerHandle,
}

fn spawn_pipeline(
    assignments: Vec<DeviceAssignment>,
    transport: Arc<dyn QueryTransport>,
    options: SchedulerOptions,
) -> Pipeline {
    let store = Arc::new(SnapshotStore::new());
    let alert_sink = Arc::new(RecordingAlertSink::default());

    let dispatcher = ReactionDispatcher::new(
        AlertDispatchHandle::spawn(alert_sink.clone()),
        Arc::new(RecordingReportSink::default()),
        options.status_metric.clone(),
    );

    let scheduler = SchedulerHandle::spawn(
        assignments,
        transport,
        store.clone(),
        dispatcher,
        Arc::new(RecordingFailureSink::default()),
        options,
    );

    Pipeline {
        store,
        alert_sink,
        scheduler,
    }
}

#[tokio::test]
async fn worker_budget_bounds_concurrent_polls() {
    let transport = Arc::new(GaugeTransport::new(Duration::from_millis(50)));
    let assignments: Vec<_> = (1..=8)
        .map(|i| status_only(&format!("10.0.0.{i}")))
        .collect();

    let pipeline = spawn_pipeline(
        assignments,
        transport.clone(),
        options(Duration::from_secs(3600), 2),
    );

    pipeline.scheduler.cycle_now().await.unwrap();

    let peak = transport.peak.load(Ordering::SeqCst);
    assert_eq!(peak, 2, "fan-out should saturate but never exceed the budget");
    assert_eq!(pipeline.store.len().await, 8);

    pipeline.scheduler.shutdown().await;
}

#[tokio::test]
async fn devices_beyond_the_budget_queue_rather_than_skip() {
    let transport = Arc::new(GaugeTransport::new(Duration::from_millis(5)));
    let assignments: Vec<_> = (1..=20)
        .map(|i| status_only(&format!("10.0.1.{i}")))
        .collect();

    let pipeline = spawn_pipeline(
        assignments,
        transport,
        options(Duration::from_secs(3600), 4),
    );

    pipeline.scheduler.cycle_now().await.unwrap();

    // every device of the cycle completed despite the small budget
    assert_eq!(pipeline.store.len().await, 20);

    pipeline.scheduler.shutdown().await;
}

#[tokio::test]
async fn overlapping_cycles_for_one_device_never_double_react() {
    // polls (250ms) outlive the cadence (100ms), so cycles overlap; the
    // per-device store lock must serialize diff-react-write, and the one
    // genuine flip must alert exactly once
    let transport = Arc::new(SlowFlipTransport {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(250),
    });

    let pipeline = spawn_pipeline(
        vec![status_only("10.0.0.1")],
        transport,
        options(Duration::from_millis(100), 4),
    );

    tokio::time::sleep(Duration::from_millis(900)).await;
    pipeline.scheduler.shutdown().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let alerts = pipeline.alert_sink.delivered.lock().unwrap().clone();
    assert_eq!(
        alerts.len(),
        1,
        "one status flip must produce exactly one alert, got {alerts:?}"
    );
    assert!(alerts[0].starts_with("link up"));
}
