use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;

use crate::{DeviceAssignment, DeviceIdentity, MetricQuery};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Device-type label → profile (query set + addresses of that type).
    pub devices: HashMap<String, DeviceProfile>,

    /// Seconds between the starts of successive poll cycles.
    #[serde(default = "default_cadence")]
    pub cadence: u64,

    /// Maximum devices polled concurrently within one cycle.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-query timeout budget in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,

    /// The metric whose value transitions trigger reactions.
    #[serde(default = "default_status_metric")]
    pub status_metric: String,

    #[serde(default = "default_community")]
    pub community: String,

    /// Directory receiving report and failure artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional webhook receiving link up/down alerts. Alerts are logged
    /// locally when unset.
    pub alert_webhook: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeviceProfile {
    /// Queries in column order; order is preserved in reports.
    pub queries: Vec<MetricQuery>,
    pub addresses: Vec<String>,
}

fn default_cadence() -> u64 {
    5
}

fn default_workers() -> usize {
    10
}

fn default_query_timeout() -> u64 {
    5
}

fn default_status_metric() -> String {
    String::from("ifOperStatus")
}

fn default_community() -> String {
    String::from("public")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Startup validation. Any error here is fatal before the first cycle;
    /// the scheduler never sees a malformed fleet.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.devices.is_empty() {
            anyhow::bail!("no device profiles configured");
        }
        if self.cadence == 0 {
            anyhow::bail!("cadence must be at least 1 second");
        }
        if self.workers == 0 {
            anyhow::bail!("worker pool size must be at least 1");
        }
        if self.query_timeout == 0 {
            anyhow::bail!("query timeout must be at least 1 second");
        }

        let mut seen = HashSet::new();
        for (device_type, profile) in &self.devices {
            if profile.queries.is_empty() {
                anyhow::bail!("device type '{device_type}' has no queries");
            }
            if profile.addresses.is_empty() {
                anyhow::bail!("device type '{device_type}' has no addresses");
            }
            for address in &profile.addresses {
                if !seen.insert((device_type.clone(), address.clone())) {
                    anyhow::bail!("duplicate device {device_type} {address}");
                }
            }
        }

        Ok(())
    }

    /// Expand the fleet into per-device work units. Each profile's query
    /// set is shared read-only across its devices and across cycles.
    pub fn assignments(&self) -> Vec<DeviceAssignment> {
        let mut assignments = Vec::new();
        for (device_type, profile) in &self.devices {
            let queries: Arc<[MetricQuery]> = profile.queries.clone().into();
            for address in &profile.addresses {
                assignments.push(DeviceAssignment {
                    identity: DeviceIdentity::new(device_type.clone(), address.clone()),
                    queries: queries.clone(),
                });
            }
        }
        assignments
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
