//! Poll failure records
//!
//! A device-fatal transport error produces one audit artifact per event,
//! so an operator can reconstruct which devices were unreachable and when
//! without trawling logs. The snapshot store is untouched by failures;
//! these records are the only trace a failed cycle leaves.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::error::SinkResult;
use super::report::artifact_key;
use crate::poller::QueryFailure;

/// Persists one poll-failure record, returning its location.
#[async_trait]
pub trait FailureSink: Send + Sync {
    async fn record(&self, failure: &QueryFailure) -> SinkResult<PathBuf>;
}

/// Writes `failure_{device-key}_{timestamp}.json` files.
pub struct JsonFailureSink {
    dir: PathBuf,
}

impl JsonFailureSink {
    pub async fn new(dir: impl Into<PathBuf>) -> SinkResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl FailureSink for JsonFailureSink {
    async fn record(&self, failure: &QueryFailure) -> SinkResult<PathBuf> {
        let path = self.dir.join(format!(
            "failure_{}_{}.json",
            artifact_key(&failure.identity),
            failure.timestamp.format("%Y-%m-%d_%H-%M-%S"),
        ));

        let body = json!({
            "device_type": failure.identity.device_type,
            "address": failure.identity.address,
            "cause": failure.cause.to_string(),
            "timestamp": failure.timestamp.to_rfc3339(),
        });

        tokio::fs::write(&path, serde_json::to_vec_pretty(&body)?).await?;

        debug!("recorded poll failure at {}", path.display());
        Ok(path)
    }
}
