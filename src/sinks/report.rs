//! Transition report artifacts
//!
//! One report per reaction call, holding every changed row of that cycle
//! with its full metric values plus per-row highlight metadata for the
//! status column. The shipped implementation writes timestamped JSON files
//! into the configured output directory.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::SinkResult;
use crate::DeviceIdentity;

/// Highlight applied to a row's status cell when the report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowHighlight {
    /// Link came up
    Normal,
    /// Link went down
    Warning,
    /// Status value outside the known vocabulary
    None,
}

/// Highlight for a new status value: down is the warning case, up renders
/// normal, anything else is left unhighlighted.
pub fn highlight_for(status: &str) -> RowHighlight {
    match status {
        "2" => RowHighlight::Warning,
        "1" => RowHighlight::Normal,
        _ => RowHighlight::None,
    }
}

/// One changed row, carrying the full metric values of the new snapshot
/// aligned to [`TransitionReport::columns`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub row: usize,
    pub prior_status: Option<String>,
    pub new_status: String,
    pub highlight: RowHighlight,
    pub cells: Vec<String>,
}

/// All transitions observed for one device in one poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionReport {
    pub device: DeviceIdentity,
    pub generated_at: DateTime<Utc>,
    pub status_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// Persists one transition report as an artifact, returning its location.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write_report(&self, report: &TransitionReport) -> SinkResult<PathBuf>;
}

/// Writes `transitions_{device-key}_{timestamp}.json` files.
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub async fn new(dir: impl Into<PathBuf>) -> SinkResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn write_report(&self, report: &TransitionReport) -> SinkResult<PathBuf> {
        let path = self.dir.join(format!(
            "transitions_{}_{}.json",
            artifact_key(&report.device),
            report.generated_at.format("%Y-%m-%d_%H-%M-%S"),
        ));

        let body = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, body).await?;

        debug!("wrote transition report to {}", path.display());
        Ok(path)
    }
}

/// Device key made filename-safe.
pub(crate) fn artifact_key(device: &DeviceIdentity) -> String {
    device.key().replace([':', '/'], "-")
}
