// ── Metric entities ──
//
// One `MetricSensor` per described value type. The coordinator pushes
// every successful batch of readings through `MetricObserver`; each
// sensor picks out its own key and caches the coerced value in a
// `watch` channel so consumers can read or await it.

use altruist_api::{DeviceModel, MetricValue, Reading};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::metric::{DeviceInfo, MetricDescription, entity_prefix};

/// Receives each successful batch of readings from a coordinator.
pub trait MetricObserver: Send + Sync {
    /// Wire value type this observer cares about.
    fn key(&self) -> &str;

    fn on_readings(&self, readings: &[Reading]);
}

/// Cached value of one metric for one device.
pub struct MetricSensor {
    description: &'static MetricDescription,
    device: DeviceModel,
    unique_id: String,
    name: String,
    value: watch::Sender<Option<MetricValue>>,
}

impl MetricSensor {
    pub fn new(device: &DeviceModel, description: &'static MetricDescription) -> Self {
        let prefix = entity_prefix(&device.id);
        let (value, _) = watch::channel(None);
        Self {
            description,
            device: device.clone(),
            unique_id: format!("{prefix}-{}", description.key),
            name: format!("{prefix} {}", description.name),
            value,
        }
    }

    /// `altruist_<id>-<key>`
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// `altruist_<id> <description name>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &'static MetricDescription {
        self.description
    }

    pub fn icon(&self) -> Option<&'static str> {
        self.description.icon()
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_device(&self.device)
    }

    /// Last coerced value, `None` until the first matching reading.
    pub fn native_value(&self) -> Option<MetricValue> {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MetricValue>> {
        self.value.subscribe()
    }
}

impl MetricObserver for MetricSensor {
    fn key(&self) -> &str {
        self.description.key
    }

    fn on_readings(&self, readings: &[Reading]) {
        let mut latest = None;
        for reading in readings.iter().filter(|r| r.value_type == self.description.key) {
            match reading.metric_value() {
                Some(value) => latest = Some(value),
                None => warn!(
                    sensor = %self.unique_id,
                    raw = %reading.value,
                    "unparsable reading, keeping previous value"
                ),
            }
        }

        if let Some(value) = latest {
            debug!(sensor = %self.unique_id, %value, "metric updated");
            self.value.send_replace(Some(value));
        }
    }
}
