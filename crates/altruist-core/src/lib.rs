// altruist-core: Polling coordinator, metric entities and setup flows for Altruist sensors

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hub;
pub mod metric;
pub mod sensor;
pub mod setup;

pub use altruist_api::{DeviceModel, MetricValue, Reading};
pub use config::{DeviceConfig, DiscoveryConfig, PollingConfig};
pub use coordinator::{Coordinator, ReadingSource, UpdateStatus};
pub use error::CoreError;
pub use hub::Hub;
pub use metric::{DeviceClass, DeviceInfo, MetricDescription, describe};
pub use sensor::{MetricObserver, MetricSensor};
pub use setup::{
    ConfigEntry, PendingDiscovery, scan, setup_discovered, setup_manual, setup_scanned,
    unconfigured, validate_address,
};
