// Device and reading types
//
// Wire models for the sensor data feed plus the device identity record
// shared by discovery, the fetch client and everything above them.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Display name every device starts with.
pub const DEFAULT_DEVICE_NAME: &str = "Altruist Sensor";

/// Id carried by a model built from a bare address, before the fetch
/// client has learned the real one.
pub const PLACEHOLDER_ID: &str = "unknown";

// ── Device ───────────────────────────────────────────────────────────

/// Identity and location of one Altruist sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: String,
    /// IP literal, optionally with `:port`, used to build request URLs.
    pub address: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub firmware_version: Option<String>,
}

fn default_name() -> String {
    DEFAULT_DEVICE_NAME.to_owned()
}

impl DeviceModel {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            name: default_name(),
            firmware_version: None,
        }
    }

    /// Model for a user-entered address. The id is a placeholder until a
    /// fetch tells us better.
    pub fn from_address(address: impl Into<String>) -> Self {
        Self::new(PLACEHOLDER_ID, address)
    }

    /// Build a model from an advertised instance name and its resolved
    /// addresses. Only the first address is used.
    pub fn from_service(instance_name: &str, addresses: &[IpAddr]) -> Result<Self, Error> {
        let address = addresses.first().ok_or_else(|| Error::Resolution {
            name: instance_name.to_owned(),
            reason: "no address in service record".into(),
        })?;
        Ok(Self::new(
            device_id_from_instance_name(instance_name),
            address.to_string(),
        ))
    }

    pub fn has_placeholder_id(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }
}

/// Extract the device id from a DNS-SD instance name.
///
/// `Altruist-sensor-ABC123._altruist._tcp.local.` gives `ABC123`: the first
/// dot-separated label, then its last hyphen-separated token. Names that do
/// not follow the `prefix-ID` convention yield whatever that rule produces.
pub fn device_id_from_instance_name(name: &str) -> String {
    let label = name.split('.').next().unwrap_or_default();
    label.rsplit('-').next().unwrap_or_default().to_owned()
}

/// Parse a user-entered address: an IP literal, optionally with a port.
///
/// Bracketed IPv6 (`[fe80::1]:8080`) and bare IPv6 are both accepted.
pub fn parse_address(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();
    if trimmed.parse::<IpAddr>().is_ok() || trimmed.parse::<std::net::SocketAddr>().is_ok() {
        return Ok(trimmed.to_owned());
    }
    Err(Error::InvalidAddress(input.to_owned()))
}

/// Host part of a request URL for an address, bracketing bare IPv6.
pub(crate) fn url_host(address: &str) -> String {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => address.to_owned(),
    }
}

// ── Readings ─────────────────────────────────────────────────────────

/// One `{value_type, value}` entry of the data feed.
///
/// Values stay as the strings the device sent; see [`Reading::metric_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub value_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
}

impl Reading {
    pub fn new(value_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value_type: value_type.into(),
            value: value.into(),
        }
    }

    /// Coerce the raw value: a decimal point means float, otherwise integer.
    /// Returns `None` when the text is not a number of that kind.
    pub fn metric_value(&self) -> Option<MetricValue> {
        let raw = self.value.trim();
        if raw.contains('.') {
            raw.parse().ok().map(MetricValue::Float)
        } else {
            raw.parse().ok().map(MetricValue::Int)
        }
    }
}

// Some firmware builds emit bare numbers; keep their text form.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// A coerced reading value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

// ── Feed body ────────────────────────────────────────────────────────

/// Parsed `/data.json` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorFeed {
    pub readings: Vec<Reading>,
    pub firmware_version: Option<String>,
    pub device_id: Option<String>,
}

/// Object form of the feed:
/// ```json
/// { "software_version": "...", "esp_chipid": "...", "sensordatavalues": [...] }
/// ```
#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    software_version: Option<String>,
    #[serde(default, alias = "esp_chipid", alias = "chip_id")]
    device_id: Option<serde_json::Value>,
    sensordatavalues: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Readings(Vec<Reading>),
    Envelope(FeedEnvelope),
}

impl SensorFeed {
    /// Parse a response body. `url` is only used for error context.
    pub fn parse(url: &str, body: &str) -> Result<Self, Error> {
        let malformed = |message: String| Error::MalformedResponse {
            url: url.to_owned(),
            message,
            body: body.to_owned(),
        };

        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        let parsed: FeedBody = serde_json::from_value(value).map_err(|_| {
            malformed("expected an array of {value_type, value} objects".to_owned())
        })?;

        Ok(match parsed {
            FeedBody::Readings(readings) => Self {
                readings,
                ..Self::default()
            },
            FeedBody::Envelope(env) => Self {
                readings: env.sensordatavalues,
                firmware_version: env.software_version.filter(|v| !v.is_empty()),
                device_id: env.device_id.and_then(|v| match v {
                    serde_json::Value::String(s) if !s.is_empty() => Some(s),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            },
        })
    }

    /// Distinct value types, in feed order.
    pub fn value_types(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.readings.len());
        for reading in &self.readings {
            if !names.contains(&reading.value_type) {
                names.push(reading.value_type.clone());
            }
        }
        names
    }
}
