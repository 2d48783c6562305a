//! CLI-aware configuration: the loaded file plus `GlobalOpts` overrides.

use std::path::PathBuf;
use std::time::Duration;

use altruist_api::TransportConfig;
use altruist_config::{Config, config_path, load_config_from, save_config_to};
use altruist_core::{DeviceConfig, DiscoveryConfig, PollingConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Loaded configuration and where it came from.
pub struct Settings {
    pub path: PathBuf,
    pub config: Config,
    timeout_override: Option<u64>,
}

impl Settings {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = global.config.clone().unwrap_or_else(config_path);
        let config = load_config_from(&path).map_err(|e| CliError::config(&path, e))?;
        if global.timeout == Some(0) {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        tracing::debug!(path = %path.display(), devices = config.devices.len(), "config loaded");
        Ok(Self {
            path,
            config,
            timeout_override: global.timeout,
        })
    }

    pub fn save(&self) -> Result<(), CliError> {
        save_config_to(&self.config, &self.path).map_err(|e| CliError::config(&self.path, e))
    }

    pub fn polling(&self) -> PollingConfig {
        let mut polling = self.config.polling();
        if let Some(secs) = self.timeout_override {
            polling.timeout = Duration::from_secs(secs);
        }
        polling
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        self.config.discovery()
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::with_timeout(self.polling().timeout)
    }

    pub fn configured(&self) -> Vec<DeviceConfig> {
        self.config.device_configs()
    }

    /// Resolve a device argument: an id or address, or the only saved
    /// device when none is given.
    pub fn resolve_device(&self, identifier: Option<&str>) -> Result<DeviceConfig, CliError> {
        if let Some(identifier) = identifier {
            return self
                .config
                .find_device(identifier)
                .ok_or_else(|| CliError::NotFound {
                    identifier: identifier.to_owned(),
                });
        }

        let mut devices = self.configured();
        match devices.len() {
            0 => Err(CliError::NoDevicesConfigured),
            1 => devices.pop().ok_or(CliError::NoDevicesConfigured),
            n => Err(CliError::Validation {
                field: "device".into(),
                reason: format!("{n} sensors are configured; name one by id or address"),
            }),
        }
    }
}
