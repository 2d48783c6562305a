// ── Runtime configuration ──
//
// These types describe *which* device to poll and *how often*.
// They never touch disk: the CLI (via altruist-config) builds them and
// hands them in.

use std::time::Duration;

use altruist_api::DeviceModel;
use altruist_api::discovery::{COLLECTION_WINDOW, RESOLVE_TIMEOUT};
use altruist_api::transport::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Persisted state of one configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub address: String,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }

    /// Fresh device model for this entry. Firmware is filled in by the
    /// first fetch.
    pub fn device(&self) -> DeviceModel {
        DeviceModel::new(self.id.clone(), self.address.clone())
    }
}

impl From<&DeviceModel> for DeviceConfig {
    fn from(device: &DeviceModel) -> Self {
        Self::new(device.id.clone(), device.address.clone())
    }
}

/// Polling cadence and per-request budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between refresh cycles.
    pub interval: Duration,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Discovery timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub collection_window: Duration,
    pub resolve_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            collection_window: COLLECTION_WINDOW,
            resolve_timeout: RESOLVE_TIMEOUT,
        }
    }
}
