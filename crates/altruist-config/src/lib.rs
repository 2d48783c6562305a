//! Configuration for the Altruist CLI.
//!
//! A TOML file with global defaults and the saved devices, merged with
//! `ALTRUIST_*` environment variables, and translated into
//! `altruist_core` runtime config. The core crate never reads files;
//! this crate is the only place that does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use altruist_core::{ConfigEntry, DeviceConfig, DiscoveryConfig, PollingConfig};

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "ALTRUIST_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Saved devices keyed by device id.
    #[serde(default)]
    pub devices: BTreeMap<String, SavedDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Discovery collection window in milliseconds.
    #[serde(default = "default_discovery_window")]
    pub discovery_window_ms: u64,

    /// Per-advertisement resolution timeout in milliseconds.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            interval: default_interval(),
            discovery_window_ms: default_discovery_window(),
            resolve_timeout_ms: default_resolve_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    PollingConfig::default().timeout.as_secs()
}
fn default_interval() -> u64 {
    PollingConfig::default().interval.as_secs()
}
#[allow(clippy::cast_possible_truncation)]
fn default_discovery_window() -> u64 {
    DiscoveryConfig::default().collection_window.as_millis() as u64
}
#[allow(clippy::cast_possible_truncation)]
fn default_resolve_timeout() -> u64 {
    DiscoveryConfig::default().resolve_timeout.as_millis() as u64
}

/// A saved device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SavedDevice {
    pub address: String,

    /// Display title chosen at setup time.
    pub title: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$ALTRUIST_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("network", "robonomics", "altruist").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("altruist");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path. A missing file yields the defaults.
///
/// Environment overrides use a double underscore as the nesting
/// separator, e.g. `ALTRUIST_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ALTRUIST_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.defaults.discovery_window_ms == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.discovery_window_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.defaults.resolve_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.resolve_timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if let Some((id, _)) = self.devices.iter().find(|(_, d)| d.address.trim().is_empty()) {
            return Err(ConfigError::Validation {
                field: format!("devices.{id}.address"),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn polling(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_secs(self.defaults.interval),
            timeout: Duration::from_secs(self.defaults.timeout),
        }
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            collection_window: Duration::from_millis(self.defaults.discovery_window_ms),
            resolve_timeout: Duration::from_millis(self.defaults.resolve_timeout_ms),
        }
    }

    /// Saved devices as core config, ordered by id.
    pub fn device_configs(&self) -> Vec<DeviceConfig> {
        self.devices
            .iter()
            .map(|(id, d)| DeviceConfig::new(id.clone(), d.address.clone()))
            .collect()
    }

    /// Saved devices with their titles.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.devices
            .iter()
            .map(|(id, d)| ConfigEntry {
                title: d.title.clone().unwrap_or_else(|| id.clone()),
                data: DeviceConfig::new(id.clone(), d.address.clone()),
            })
            .collect()
    }

    /// Look a device up by id, falling back to its address.
    pub fn find_device(&self, id_or_address: &str) -> Option<DeviceConfig> {
        self.devices
            .get(id_or_address)
            .map(|d| DeviceConfig::new(id_or_address, d.address.clone()))
            .or_else(|| {
                self.devices
                    .iter()
                    .find(|(_, d)| d.address == id_or_address)
                    .map(|(id, d)| DeviceConfig::new(id.clone(), d.address.clone()))
            })
    }

    /// Insert or replace the entry's device.
    pub fn add_entry(&mut self, entry: ConfigEntry) {
        self.devices.insert(
            entry.data.id,
            SavedDevice {
                address: entry.data.address,
                title: Some(entry.title),
            },
        );
    }

    /// Remove a device by id or address, returning what was removed.
    pub fn remove_device(&mut self, id_or_address: &str) -> Option<DeviceConfig> {
        let found = self.find_device(id_or_address)?;
        self.devices.remove(&found.id);
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core() {
        let cfg = Config::default();
        assert_eq!(cfg.polling(), PollingConfig::default());
        assert_eq!(cfg.discovery(), DiscoveryConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn find_by_id_or_address() {
        let mut cfg = Config::default();
        cfg.add_entry(ConfigEntry {
            title: "Altruist Sensor ABC".into(),
            data: DeviceConfig::new("ABC", "10.0.0.5"),
        });

        assert_eq!(cfg.find_device("ABC").map(|d| d.address), Some("10.0.0.5".into()));
        assert_eq!(cfg.find_device("10.0.0.5").map(|d| d.id), Some("ABC".into()));
        assert!(cfg.find_device("nope").is_none());

        assert!(cfg.remove_device("10.0.0.5").is_some());
        assert!(cfg.devices.is_empty());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        cfg.defaults.timeout = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation { .. })));
    }
}
