//! Helper fixtures for integration tests

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linkwatch::dispatch::{AlertDispatchHandle, ReactionDispatcher};
use linkwatch::poller::QueryFailure;
use linkwatch::scheduler::{SchedulerHandle, SchedulerOptions};
use linkwatch::sinks::{AlertSink, FailureSink, ReportSink, SinkError, SinkResult, TransitionReport};
use linkwatch::store::SnapshotStore;
use linkwatch::transport::{QueryTransport, RowValue, TransportError, TransportResult};
use linkwatch::{DeviceAssignment, DeviceIdentity, MetricQuery};

pub const STATUS_OID: &str = "1.3.6.1.2.1.2.2.1.8";
pub const INDEX_OID: &str = "1.3.6.1.2.1.2.2.1.1";

/// Transport scripted per (address, oid) with a per-call sequence of
/// results; the last scripted result repeats for later calls.
#[derive(Default)]
pub struct FleetTransport {
    scripts: Mutex<HashMap<(String, String), VecDeque<TransportResult<Vec<(u32, RowValue)>>>>>,
}

impl FleetTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(
        &self,
        address: &str,
        oid: &str,
        results: Vec<TransportResult<Vec<(u32, RowValue)>>>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .entry((address.to_string(), oid.to_string()))
            .or_default()
            .extend(results);
    }
}

#[async_trait]
impl QueryTransport for FleetTransport {
    async fn walk(
        &self,
        address: &str,
        oid: &str,
        _timeout: Duration,
    ) -> TransportResult<Vec<(u32, RowValue)>> {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(&(address.to_string(), oid.to_string())) else {
            return Err(TransportError::Unreachable("unscripted".to_string()));
        };

        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Unreachable("unscripted".to_string())))
        }
    }
}

/// One walked column of plain values.
pub fn column(values: &[&str]) -> TransportResult<Vec<(u32, RowValue)>> {
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32 + 1, RowValue::Value((*v).to_string())))
        .collect())
}

#[derive(Default)]
pub struct RecordingAlertSink {
    pub delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn notify(&self, message: &str) -> SinkResult<()> {
        self.delivered.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReportSink {
    pub reports: Mutex<Vec<TransitionReport>>,
    pub fail: bool,
}

#[async_trait]
impl ReportSink for RecordingReportSink {
    async fn write_report(&self, report: &TransitionReport) -> SinkResult<PathBuf> {
        if self.fail {
            return Err(SinkError::Http("report sink down".to_string()));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(PathBuf::from("/dev/null"))
    }
}

#[derive(Default)]
pub struct RecordingFailureSink {
    pub records: Mutex<Vec<QueryFailure>>,
    pub fail: bool,
}

#[async_trait]
impl FailureSink for RecordingFailureSink {
    async fn record(&self, failure: &QueryFailure) -> SinkResult<PathBuf> {
        if self.fail {
            return Err(SinkError::Http("failure sink down".to_string()));
        }
        self.records.lock().unwrap().push(failure.clone());
        Ok(PathBuf::from("/dev/null"))
    }
}

/// Device polled for ifIndex + ifOperStatus.
pub fn switch(address: &str) -> DeviceAssignment {
    DeviceAssignment {
        identity: DeviceIdentity::new("OmniSwitch", address),
        queries: vec![
            MetricQuery::new("ifIndex", INDEX_OID),
            MetricQuery::new("ifOperStatus", STATUS_OID),
        ]
        .into(),
    }
}

/// A fully wired pipeline over the scripted transport, driven manually
/// through `scheduler.cycle_now()`. The cadence is long enough that the
/// timer never interferes with a test run.
pub struct TestFleet {
    pub transport: Arc<FleetTransport>,
    pub store: Arc<SnapshotStore>,
    pub alert_sink: Arc<RecordingAlertSink>,
    pub report_sink: Arc<RecordingReportSink>,
    pub failure_sink: Arc<RecordingFailureSink>,
    pub scheduler: SchedulerHandle,
}

impl TestFleet {
    pub fn spawn(assignments: Vec<DeviceAssignment>) -> Self {
        Self::spawn_with(
            assignments,
            Arc::new(RecordingReportSink::default()),
            Arc::new(RecordingFailureSink::default()),
            SchedulerOptions {
                cadence: Duration::from_secs(3600),
                workers: 10,
                query_timeout: Duration::from_secs(1),
                status_metric: "ifOperStatus".to_string(),
            },
        )
    }

    pub fn spawn_with(
        assignments: Vec<DeviceAssignment>,
        report_sink: Arc<RecordingReportSink>,
        failure_sink: Arc<RecordingFailureSink>,
        options: SchedulerOptions,
    ) -> Self {
        let transport = Arc::new(FleetTransport::new());
        let store = Arc::new(SnapshotStore::new());
        let alert_sink = Arc::new(RecordingAlertSink::default());

        let dispatcher = ReactionDispatcher::new(
            AlertDispatchHandle::spawn(alert_sink.clone()),
            report_sink.clone(),
            options.status_metric.clone(),
        );

        let scheduler = SchedulerHandle::spawn(
            assignments,
            transport.clone(),
            store.clone(),
            dispatcher,
            failure_sink.clone(),
            options,
        );

        Self {
            transport,
            store,
            alert_sink,
            report_sink,
            failure_sink,
            scheduler,
        }
    }

    /// Run one cycle and give the alert dispatch task time to drain.
    pub async fn cycle(&self) {
        self.scheduler.cycle_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alert_sink.delivered.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<TransitionReport> {
        self.report_sink.reports.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<QueryFailure> {
        self.failure_sink.records.lock().unwrap().clone()
    }
}
