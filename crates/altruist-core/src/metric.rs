// ── Metric descriptions ──
//
// Static table of the value types an Altruist device reports and how
// each one is presented: display name, unit, device class. Value types
// without an entry are still fetched but get no metric entity.

use altruist_api::DeviceModel;
use altruist_api::model::DEFAULT_DEVICE_NAME;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

/// Integration domain used in device identifiers.
pub const DOMAIN: &str = "altruist";

/// Manufacturer reported in device info.
pub const MANUFACTURER: &str = "Robonomics";

/// Semantic class of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Pm1,
    Pm25,
    Pm10,
    Temperature,
    Humidity,
    Pressure,
    SoundPressure,
    SignalStrength,
    CarbonDioxide,
}

/// How one value type is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDescription {
    /// Wire `value_type` this description matches.
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
}

impl MetricDescription {
    const fn new(
        key: &'static str,
        name: &'static str,
        unit: &'static str,
        device_class: DeviceClass,
    ) -> Self {
        Self {
            key,
            name,
            unit: Some(unit),
            device_class: Some(device_class),
        }
    }

    /// Frontend icon for particulate classes; `None` otherwise.
    pub fn icon(&self) -> Option<&'static str> {
        match self.device_class? {
            DeviceClass::Pm1 | DeviceClass::Pm25 => Some("mdi:thought-bubble-outline"),
            DeviceClass::Pm10 => Some("mdi:thought-bubble"),
            _ => None,
        }
    }
}

const UG_PER_M3: &str = "µg/m³";

pub const METRIC_DESCRIPTIONS: &[MetricDescription] = &[
    // Particulates (SDS011 / PMS family)
    MetricDescription::new("SDS_P1", "PM10", UG_PER_M3, DeviceClass::Pm10),
    MetricDescription::new("SDS_P2", "PM2.5", UG_PER_M3, DeviceClass::Pm25),
    MetricDescription::new("PMS_P0", "PM1", UG_PER_M3, DeviceClass::Pm1),
    MetricDescription::new("PMS_P1", "PM10", UG_PER_M3, DeviceClass::Pm10),
    MetricDescription::new("PMS_P2", "PM2.5", UG_PER_M3, DeviceClass::Pm25),
    // Climate
    MetricDescription::new("BME280_temperature", "Temperature", "°C", DeviceClass::Temperature),
    MetricDescription::new("BME280_humidity", "Humidity", "%", DeviceClass::Humidity),
    MetricDescription::new("BME280_pressure", "Pressure", "Pa", DeviceClass::Pressure),
    MetricDescription::new("BMP280_temperature", "Temperature", "°C", DeviceClass::Temperature),
    MetricDescription::new("BMP280_pressure", "Pressure", "Pa", DeviceClass::Pressure),
    MetricDescription::new("HTU21D_temperature", "Temperature", "°C", DeviceClass::Temperature),
    MetricDescription::new("HTU21D_humidity", "Humidity", "%", DeviceClass::Humidity),
    MetricDescription::new("SCD4x_co2", "CO2", "ppm", DeviceClass::CarbonDioxide),
    // Noise
    MetricDescription::new("PCBA_noiseMax", "Noise max", "dB", DeviceClass::SoundPressure),
    MetricDescription::new("PCBA_noiseAvg", "Noise avg", "dB", DeviceClass::SoundPressure),
    // Connectivity
    MetricDescription::new("signal", "Wi-Fi signal", "dBm", DeviceClass::SignalStrength),
];

/// Look up the description for a wire value type.
pub fn describe(key: &str) -> Option<&'static MetricDescription> {
    METRIC_DESCRIPTIONS.iter().find(|d| d.key == key)
}

/// Registry-facing identity of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, altruist_<id>)` pairs.
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: Option<String>,
    pub configuration_url: String,
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn for_device(device: &DeviceModel) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_owned(), entity_prefix(&device.id))],
            name: format!("{DEFAULT_DEVICE_NAME} {}", device.id),
            manufacturer: MANUFACTURER.to_owned(),
            model: DEFAULT_DEVICE_NAME.to_owned(),
            sw_version: device.firmware_version.clone(),
            configuration_url: format!("http://{}", device.address),
            serial_number: device.id.clone(),
        }
    }
}

/// `altruist_<id>`, the shared prefix of entity ids and names.
pub fn entity_prefix(device_id: &str) -> String {
    format!("{DOMAIN}_{device_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = METRIC_DESCRIPTIONS.iter().map(|d| d.key).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn particulate_icons() {
        assert_eq!(describe("SDS_P2").and_then(MetricDescription::icon), Some("mdi:thought-bubble-outline"));
        assert_eq!(describe("SDS_P1").and_then(MetricDescription::icon), Some("mdi:thought-bubble"));
        assert_eq!(describe("BME280_humidity").and_then(MetricDescription::icon), None);
        assert!(describe("PM25").is_none());
    }

    #[test]
    fn device_class_round_trips_through_strum() {
        assert_eq!(DeviceClass::Pm25.to_string(), "pm25");
        assert_eq!("signal_strength".parse::<DeviceClass>().ok(), Some(DeviceClass::SignalStrength));
    }

    #[test]
    fn device_info_for_device() {
        let mut device = DeviceModel::new("ABC123", "192.168.1.20");
        device.firmware_version = Some("R_2024-07".into());

        let info = DeviceInfo::for_device(&device);
        assert_eq!(info.identifiers, vec![("altruist".to_owned(), "altruist_ABC123".to_owned())]);
        assert_eq!(info.name, "Altruist Sensor ABC123");
        assert_eq!(info.manufacturer, "Robonomics");
        assert_eq!(info.model, "Altruist Sensor");
        assert_eq!(info.sw_version.as_deref(), Some("R_2024-07"));
        assert_eq!(info.configuration_url, "http://192.168.1.20");
        assert_eq!(info.serial_number, "ABC123");
    }
}
