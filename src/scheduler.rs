//! Scheduler - cadence-driven fan-out over the device fleet
//!
//! Each cadence tick dispatches one poll cycle: every configured device is
//! polled once, with at most `workers` polls in flight at a time. Devices
//! beyond the worker budget queue for a free slot instead of spawning
//! unbounded tasks - the bounded fan-out is the sole backpressure
//! mechanism.
//!
//! The tick loop never waits for a cycle to finish before arming the next
//! tick, so the cadence stays wall-clock-anchored. A cycle outliving the
//! cadence is logged; overlapping polls of the same device are still safe
//! because the whole read-diff-react-write sequence runs under that
//! device's store lock.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → [poll device → diff → react → store] × fleet (bounded)
//!     ↑
//!     └─── Commands (CycleNow, Shutdown)
//! ```
//!
//! Shutdown lets in-flight cycles run to completion; per-device sequences
//! are never cut between alert and report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, instrument, trace, warn};

use crate::DeviceAssignment;
use crate::config::Config;
use crate::diff::diff;
use crate::dispatch::ReactionDispatcher;
use crate::poller::Poller;
use crate::sinks::FailureSink;
use crate::store::SnapshotStore;
use crate::transport::QueryTransport;

/// Commands that can be sent to the Scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one full poll cycle immediately (bypassing the cadence timer)
    /// and report back when it completes. Used for testing and manual
    /// refresh.
    CycleNow { respond_to: oneshot::Sender<()> },

    /// Gracefully shut down: finish in-flight cycles, start no new ones.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub cadence: Duration,
    pub workers: usize,
    pub query_timeout: Duration,
    pub status_metric: String,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cadence: Duration::from_secs(config.cadence),
            workers: config.workers,
            query_timeout: Duration::from_secs(config.query_timeout),
            status_metric: config.status_metric.clone(),
        }
    }
}

/// One poll cycle's worth of work, shared between the ticked and the
/// command-triggered paths.
struct CycleRunner {
    assignments: Vec<DeviceAssignment>,
    workers: usize,
    poller: Poller,
    store: Arc<SnapshotStore>,
    dispatcher: ReactionDispatcher,
    failure_sink: Arc<dyn FailureSink>,
    status_metric: String,
}

impl CycleRunner {
    /// Poll every device once, at most `workers` concurrently.
    #[instrument(skip(self))]
    async fn run_cycle(&self) {
        trace!("dispatching cycle across {} devices", self.assignments.len());

        futures::stream::iter(self.assignments.iter())
            .for_each_concurrent(self.workers, |assignment| async move {
                self.process_device(assignment).await;
            })
            .await;

        trace!("cycle complete");
    }

    /// The strictly ordered per-device sequence: poll, then under the
    /// device's store lock read the baseline, diff, react, and only then
    /// advance the store. A failure leaves the stored baseline untouched
    /// so one transient outage does not reset transition history.
    async fn process_device(&self, assignment: &DeviceAssignment) {
        match self
            .poller
            .poll(&assignment.identity, &assignment.queries)
            .await
        {
            Ok(snapshot) => {
                let cell = self.store.entry(&assignment.identity).await;
                let mut guard = cell.lock().await;

                let changes = diff(guard.as_ref(), &snapshot, &self.status_metric);
                if !changes.is_empty() {
                    debug!(
                        "{}: {} status transition(s) detected",
                        assignment.identity,
                        changes.len()
                    );
                    self.dispatcher.react(&snapshot, &changes).await;
                }

                *guard = Some(snapshot);
            }
            Err(failure) => {
                warn!("{}: poll failed: {}", failure.identity, failure.cause);
                if let Err(e) = self.failure_sink.record(&failure).await {
                    error!("failed to record poll failure: {e}");
                }
            }
        }
    }
}

pub struct Scheduler {
    runner: Arc<CycleRunner>,
    cadence: Duration,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    /// Run until a Shutdown command arrives or the command channel closes.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting scheduler: {} devices, cadence {:?}",
            self.runner.assignments.len(),
            self.cadence
        );

        let mut ticker = interval(self.cadence);
        // interval's first tick completes immediately; consume it so the
        // first cycle lands one full cadence after startup
        ticker.tick().await;
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    in_flight.retain(|cycle| !cycle.is_finished());
                    if !in_flight.is_empty() {
                        warn!("{} cycle(s) still in flight at cadence tick", in_flight.len());
                    }

                    let runner = self.runner.clone();
                    in_flight.push(tokio::spawn(async move { runner.run_cycle().await }));
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::CycleNow { respond_to } => {
                            debug!("received CycleNow command");
                            self.runner.run_cycle().await;
                            let _ = respond_to.send(());
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        for cycle in in_flight {
            if let Err(e) = cycle.await {
                error!("cycle task failed: {e}");
            }
        }

        debug!("scheduler stopped");
    }
}

/// Handle for controlling a running Scheduler
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Build the scheduler and spawn it as a tokio task.
    pub fn spawn(
        assignments: Vec<DeviceAssignment>,
        transport: Arc<dyn QueryTransport>,
        store: Arc<SnapshotStore>,
        dispatcher: ReactionDispatcher,
        failure_sink: Arc<dyn FailureSink>,
        options: SchedulerOptions,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let runner = CycleRunner {
            assignments,
            workers: options.workers,
            poller: Poller::new(transport, options.query_timeout),
            store,
            dispatcher,
            failure_sink,
            status_metric: options.status_metric,
        };

        let scheduler = Scheduler {
            runner: Arc::new(runner),
            cadence: options.cadence,
            command_rx: cmd_rx,
        };

        let task = tokio::spawn(scheduler.run());

        Self {
            sender: cmd_tx,
            task,
        }
    }

    /// Trigger one full cycle and wait for it to complete.
    pub async fn cycle_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::CycleNow { respond_to: tx })
            .await
            .context("failed to send CycleNow command")?;

        rx.await.context("failed to receive cycle completion")?;
        Ok(())
    }

    /// Shut down and wait for the scheduler (and its in-flight cycles)
    /// to finish.
    pub async fn shutdown(self) {
        let _ = self.sender.send(SchedulerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            error!("scheduler task failed: {e}");
        }
    }
}
