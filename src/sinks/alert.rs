//! Alert delivery

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use super::error::{SinkError, SinkResult};

/// Short bound on webhook round trips so a dead receiver cannot back up
/// the alert queue for long.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget alert delivery. One call per qualifying transition.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, message: &str) -> SinkResult<()>;
}

/// Posts `{message, timestamp}` JSON to a configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn notify(&self, message: &str) -> SinkResult<()> {
        let payload = json!({
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Http(format!(
                "webhook responded with status {}",
                response.status()
            )))
        }
    }
}

/// Default sink when no webhook is configured: alerts land in the log.
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, message: &str) -> SinkResult<()> {
        info!("ALERT: {message}");
        Ok(())
    }
}
