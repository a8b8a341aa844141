//! ReactionDispatcher - turns row changes into alerts and a report
//!
//! Alert delivery is decoupled from the poll path: qualifying changes are
//! enqueued onto a bounded channel consumed by an independent dispatch
//! task, so a slow or failing alert sink can never stall the diff/store
//! sequence of any device. The report write is awaited in place - it is a
//! local file, bounded by the filesystem, and the cycle wants its location
//! logged.
//!
//! Alert and report delivery are independent best-effort side effects.
//! Either failing is logged and contained; neither prevents the other.
//!
//! ## Message Flow
//!
//! ```text
//! RowChanges → [alert per "1"/"2" transition] → bounded mpsc → dispatch task → AlertSink
//!            → [one report, all changed rows] ───────────────────────────→ ReportSink
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::Snapshot;
use crate::diff::RowChange;
use crate::sinks::report::{ReportRow, highlight_for};
use crate::sinks::{AlertSink, ReportSink, TransitionReport};

/// Pending alerts beyond this queue depth are dropped with a warning
/// rather than blocking the poll path.
const ALERT_QUEUE_DEPTH: usize = 64;

#[derive(Debug)]
enum AlertMessage {
    Deliver(String),
    Shutdown,
}

/// Handle to the alert-dispatch task.
#[derive(Clone)]
pub struct AlertDispatchHandle {
    sender: mpsc::Sender<AlertMessage>,
}

impl AlertDispatchHandle {
    /// Spawn the dispatch task draining the alert queue into `sink`.
    pub fn spawn(sink: Arc<dyn AlertSink>) -> Self {
        let (tx, mut rx) = mpsc::channel(ALERT_QUEUE_DEPTH);

        tokio::spawn(async move {
            debug!("alert dispatch task started");
            while let Some(message) = rx.recv().await {
                match message {
                    AlertMessage::Deliver(text) => {
                        if let Err(e) = sink.notify(&text).await {
                            error!("failed to deliver alert: {e}");
                        }
                    }
                    AlertMessage::Shutdown => break,
                }
            }
            debug!("alert dispatch task stopped");
        });

        Self { sender: tx }
    }

    /// Enqueue without blocking; a full queue drops the alert.
    pub fn enqueue(&self, message: String) {
        if let Err(e) = self.sender.try_send(AlertMessage::Deliver(message)) {
            warn!("alert queue full, dropping alert: {e}");
        }
    }

    /// Drain already-queued alerts, then stop the task.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertMessage::Shutdown).await;
    }
}

pub struct ReactionDispatcher {
    alerts: AlertDispatchHandle,
    report_sink: Arc<dyn ReportSink>,
    status_metric: String,
}

impl ReactionDispatcher {
    pub fn new(
        alerts: AlertDispatchHandle,
        report_sink: Arc<dyn ReportSink>,
        status_metric: impl Into<String>,
    ) -> Self {
        Self {
            alerts,
            report_sink,
            status_metric: status_metric.into(),
        }
    }

    /// React to a device's detected transitions. Called only with
    /// non-empty `changes`.
    ///
    /// Fires one alert per link up/down transition in row order, then
    /// writes one report artifact carrying every changed row. A change
    /// without a prior value is a first observation and never alerts,
    /// though it still appears in the report.
    #[instrument(skip_all, fields(device = %snapshot.identity, changes = changes.len()))]
    pub async fn react(&self, snapshot: &Snapshot, changes: &[RowChange]) {
        for change in changes {
            if change.prior.is_none() {
                continue;
            }

            let transition = match change.new.as_str() {
                "1" => "link up",
                "2" => "link down",
                _ => continue,
            };

            self.alerts.enqueue(format!(
                "{transition} on {} row {}",
                snapshot.identity, change.row
            ));
        }

        let report = self.build_report(snapshot, changes);
        match self.report_sink.write_report(&report).await {
            Ok(location) => debug!("transition report at {}", location.display()),
            Err(e) => error!("failed to write transition report: {e}"),
        }
    }

    fn build_report(&self, snapshot: &Snapshot, changes: &[RowChange]) -> TransitionReport {
        let rows = changes
            .iter()
            .map(|change| ReportRow {
                row: change.row,
                prior_status: change.prior.clone(),
                new_status: change.new.clone(),
                highlight: highlight_for(&change.new),
                cells: snapshot
                    .columns
                    .iter()
                    .map(|col| snapshot.value(change.row, col).unwrap_or_default().to_string())
                    .collect(),
            })
            .collect();

        TransitionReport {
            device: snapshot.identity.clone(),
            generated_at: Utc::now(),
            status_column: self.status_metric.clone(),
            columns: snapshot.columns.clone(),
            rows,
        }
    }
}
