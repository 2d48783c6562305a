// ── Setup flows ──
//
// Turning an address, an announced service or a network scan into a
// saved `ConfigEntry`. Persistence is the caller's job; these functions
// only validate and check for duplicates against what the caller passes in.

use altruist_api::model::{DEFAULT_DEVICE_NAME, parse_address};
use altruist_api::{AltruistClient, DeviceModel, Discoverer, ResolvedService, TransportConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DeviceConfig;
use crate::error::CoreError;

/// A saved device with its display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub title: String,
    pub data: DeviceConfig,
}

/// Accept an IP literal (v4 or v6), optionally with a port. Hostnames
/// are rejected.
pub fn validate_address(input: &str) -> Result<String, CoreError> {
    parse_address(input).map_err(|_| CoreError::InvalidAddress {
        address: input.to_owned(),
    })
}

fn ensure_unconfigured(id: &str, configured: &[DeviceConfig]) -> Result<(), CoreError> {
    if configured.iter().any(|d| d.id == id) {
        return Err(CoreError::AlreadyConfigured { id: id.to_owned() });
    }
    Ok(())
}

// ── Manual ───────────────────────────────────────────────────────

/// Validate a user-entered address by fetching from it.
///
/// Every fetch failure (unreachable, HTTP error, bad body) collapses to
/// [`CoreError::NoDeviceFound`].
pub async fn setup_manual(
    transport: &TransportConfig,
    address: &str,
    configured: &[DeviceConfig],
) -> Result<ConfigEntry, CoreError> {
    let address = validate_address(address)?;
    let http = transport.build_client()?;

    let client = AltruistClient::from_address(http, &address)
        .await
        .map_err(|e| {
            debug!(%address, error = %e, "manual validation failed");
            CoreError::NoDeviceFound {
                address: address.clone(),
            }
        })?;

    let device = client.device();
    ensure_unconfigured(&device.id, configured)?;
    info!(id = %device.id, %address, "device added manually");

    Ok(ConfigEntry {
        title: address,
        data: DeviceConfig::from(device),
    })
}

// ── Discovered ───────────────────────────────────────────────────

/// A device announced on the network, awaiting user confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDiscovery {
    device: DeviceModel,
}

impl PendingDiscovery {
    pub fn device(&self) -> &DeviceModel {
        &self.device
    }

    /// `Altruist Sensor <id>`
    pub fn title(&self) -> String {
        format!("{DEFAULT_DEVICE_NAME} {}", self.device.id)
    }

    pub fn confirm(self) -> ConfigEntry {
        info!(id = %self.device.id, address = %self.device.address, "discovered device confirmed");
        ConfigEntry {
            title: self.title(),
            data: DeviceConfig::from(&self.device),
        }
    }
}

/// Start the confirmation step for an announced service.
pub fn setup_discovered(
    service: &ResolvedService,
    configured: &[DeviceConfig],
) -> Result<PendingDiscovery, CoreError> {
    let device = DeviceModel::try_from(service)?;
    setup_scanned(device, configured)
}

/// Start the confirmation step for a device returned by [`scan`].
pub fn setup_scanned(
    device: DeviceModel,
    configured: &[DeviceConfig],
) -> Result<PendingDiscovery, CoreError> {
    ensure_unconfigured(&device.id, configured)?;
    Ok(PendingDiscovery { device })
}

// ── Scan ─────────────────────────────────────────────────────────

/// Run one discovery window. An empty network is an error here.
pub async fn scan(discoverer: &Discoverer) -> Result<Vec<DeviceModel>, CoreError> {
    let devices = discoverer.get_devices().await?;
    if devices.is_empty() {
        return Err(CoreError::NoDevicesFound);
    }
    info!(count = devices.len(), "devices discovered");
    Ok(devices)
}

/// Devices from a scan that are not configured yet.
pub fn unconfigured<'a>(
    devices: &'a [DeviceModel],
    configured: &'a [DeviceConfig],
) -> impl Iterator<Item = &'a DeviceModel> + 'a {
    devices
        .iter()
        .filter(move |d| configured.iter().all(|c| c.id != d.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_address_accepts_ip_literals_only() {
        assert_eq!(validate_address(" 192.168.1.20 ").ok().as_deref(), Some("192.168.1.20"));
        assert!(validate_address("fe80::1").is_ok());
        assert!(validate_address("192.168.1.20:8080").is_ok());
        assert!(matches!(
            validate_address("sensor.local"),
            Err(CoreError::InvalidAddress { .. })
        ));
        assert!(validate_address("").is_err());
    }

    fn announced(name: &str, ip: &str) -> ResolvedService {
        ResolvedService {
            name: name.into(),
            addresses: ip.parse::<std::net::IpAddr>().into_iter().collect(),
            port: 80,
            ..ResolvedService::default()
        }
    }

    #[test]
    fn discovered_confirmation_titles_entry() {
        let pending = setup_discovered(
            &announced("Altruist-sensor-ABC123._altruist._tcp.local.", "192.168.1.44"),
            &[],
        );
        let entry = match pending {
            Ok(p) => p.confirm(),
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(entry.title, "Altruist Sensor ABC123");
        assert_eq!(entry.data, DeviceConfig::new("ABC123", "192.168.1.44"));
    }

    #[test]
    fn discovered_duplicate_is_rejected() {
        let configured = [DeviceConfig::new("ABC123", "10.0.0.1")];
        let result = setup_discovered(
            &announced("Altruist-sensor-ABC123._altruist._tcp.local.", "192.168.1.44"),
            &configured,
        );
        assert!(matches!(result, Err(CoreError::AlreadyConfigured { id }) if id == "ABC123"));
    }

    #[test]
    fn discovered_without_address_is_a_discovery_error() {
        let service = ResolvedService {
            name: "Altruist-X".into(),
            ..ResolvedService::default()
        };
        assert!(matches!(
            setup_discovered(&service, &[]),
            Err(CoreError::Discovery { .. })
        ));
    }

    #[test]
    fn unconfigured_filters_known_ids() {
        let devices = [
            DeviceModel::new("A", "10.0.0.1"),
            DeviceModel::new("B", "10.0.0.2"),
        ];
        let configured = [DeviceConfig::new("A", "10.0.0.1")];
        let ids: Vec<_> = unconfigured(&devices, &configured).map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["B"]);
    }
}
