// ── Per-device runtime ──
//
// A `Hub` is one configured device brought to life: a connected client,
// a coordinator polling it and the metric sensors fed by that
// coordinator.

use std::sync::Arc;

use altruist_api::{AltruistClient, DeviceModel, TransportConfig};
use tracing::{error, info};

use crate::config::{DeviceConfig, PollingConfig};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::metric::describe;
use crate::sensor::MetricSensor;

pub struct Hub {
    device: DeviceModel,
    coordinator: Coordinator,
    sensors: Vec<Arc<MetricSensor>>,
}

impl Hub {
    /// Connect to a saved device, run the first refresh and start polling.
    ///
    /// Any failure before polling starts is reported as
    /// [`CoreError::NotReady`], so the caller can retry later.
    pub async fn setup(entry: &DeviceConfig, polling: &PollingConfig) -> Result<Self, CoreError> {
        let http = TransportConfig::with_timeout(polling.timeout).build_client()?;

        let client = AltruistClient::connect(http, entry.device())
            .await
            .map_err(|e| {
                error!(address = %entry.address, error = %e, "failed to connect to device");
                CoreError::NotReady {
                    address: entry.address.clone(),
                    reason: e.to_string(),
                }
            })?;

        let device = client.device().clone();
        let sensors: Vec<Arc<MetricSensor>> = client
            .sensor_names()
            .iter()
            .filter_map(|name| describe(name))
            .map(|description| Arc::new(MetricSensor::new(&device, description)))
            .collect();

        let coordinator = Coordinator::new(Arc::new(client), polling.interval);
        for sensor in &sensors {
            coordinator.register(Arc::clone(sensor) as _);
        }

        coordinator.first_refresh().await?;
        coordinator.start().await;

        info!(
            id = %device.id,
            address = %device.address,
            sensors = sensors.len(),
            "device set up"
        );
        Ok(Self {
            device,
            coordinator,
            sensors,
        })
    }

    pub fn device(&self) -> &DeviceModel {
        &self.device
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn sensors(&self) -> &[Arc<MetricSensor>] {
        &self.sensors
    }

    /// Stop polling. Sensors keep their last values.
    pub async fn unload(&self) {
        self.coordinator.shutdown().await;
        info!(id = %self.device.id, "device unloaded");
    }
}
