//! Reaction and audit sinks
//!
//! Trait-based seams for everything the core pushes out of process:
//! alerts, transition reports and poll-failure records. Mirrors are
//! deliberately thin - each sink is best-effort, and a failing sink is
//! logged and contained by the caller, never escalated into the poll
//! cycle.
//!
//! ## Implementations
//!
//! - **Alerts**: webhook POST, or plain log output when no webhook is
//!   configured
//! - **Reports / failures**: timestamped JSON artifacts in the configured
//!   output directory

pub mod alert;
pub mod error;
pub mod failure;
pub mod report;

pub use alert::{AlertSink, LogAlertSink, WebhookAlertSink};
pub use error::{SinkError, SinkResult};
pub use failure::{FailureSink, JsonFailureSink};
pub use report::{JsonReportSink, ReportSink, RowHighlight, TransitionReport};
