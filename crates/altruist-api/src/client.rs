// Sensor data-feed HTTP client
//
// Wraps `reqwest::Client` with the device's URL scheme, status
// classification and feed parsing. One client is bound to one device.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::model::{self, DeviceModel, Reading, SensorFeed};

/// Path of the sensor-value feed on every device.
pub const DATA_PATH: &str = "/data.json";

/// HTTP client for one Altruist sensor.
///
/// Built either from a discovered/saved [`DeviceModel`] via
/// [`connect`](Self::connect) or from a bare address via
/// [`from_address`](Self::from_address). Both perform one validation fetch;
/// afterwards [`fetch_data`](Self::fetch_data) is side-effect free.
#[derive(Debug, Clone)]
pub struct AltruistClient {
    http: reqwest::Client,
    device: DeviceModel,
    data_url: Url,
    sensor_names: Vec<String>,
}

impl AltruistClient {
    /// Bind a client to a device without touching the network.
    pub fn new(http: reqwest::Client, device: DeviceModel) -> Result<Self, Error> {
        let data_url = data_url(&device.address)?;
        Ok(Self {
            http,
            device,
            data_url,
            sensor_names: Vec::new(),
        })
    }

    /// Validate a known device with one fetch and backfill its firmware
    /// version.
    pub async fn connect(http: reqwest::Client, device: DeviceModel) -> Result<Self, Error> {
        let mut client = Self::new(http, device)?;
        let feed = client.fetch_feed().await?;
        client.absorb(feed);
        Ok(client)
    }

    /// Build a client for a user-entered address.
    ///
    /// Performs one fetch to prove a sensor answers there and to learn its
    /// id. When the feed carries no identity the id is derived from the
    /// address so that it is stable for that entry.
    pub async fn from_address(http: reqwest::Client, address: &str) -> Result<Self, Error> {
        let address = model::parse_address(address)?;
        let mut client = Self::new(http, DeviceModel::from_address(address))?;
        let feed = client.fetch_feed().await?;
        client.absorb(feed);
        if client.device.has_placeholder_id() {
            client.device.id = id_from_address(&client.device.address);
        }
        debug!(id = %client.device.id, address = %client.device.address, "device identified");
        Ok(client)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn device(&self) -> &DeviceModel {
        &self.device
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn data_url(&self) -> &Url {
        &self.data_url
    }

    /// Value types reported by the validation fetch.
    pub fn sensor_names(&self) -> &[String] {
        &self.sensor_names
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Fetch the current readings, values left as sent.
    pub async fn fetch_data(&self) -> Result<Vec<Reading>, Error> {
        Ok(self.fetch_feed().await?.readings)
    }

    /// Fetch and parse the full feed, including identity fields.
    pub async fn fetch_feed(&self) -> Result<SensorFeed, Error> {
        let url = self.data_url.clone();
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::unreachable(&url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::DeviceUnreachable {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {status}"),
            });
        }

        let body = resp.text().await.map_err(|e| Error::unreachable(&url, &e))?;
        let feed = SensorFeed::parse(url.as_str(), &body)?;
        debug!(readings = feed.readings.len(), "feed parsed");
        Ok(feed)
    }

    fn absorb(&mut self, feed: SensorFeed) {
        if self.device.firmware_version.is_none() {
            self.device.firmware_version = feed.firmware_version.clone();
        }
        if self.device.has_placeholder_id() {
            if let Some(id) = feed.device_id.clone() {
                self.device.id = id;
            }
        }
        self.sensor_names = feed.value_types();
    }
}

fn data_url(address: &str) -> Result<Url, Error> {
    if address.trim().is_empty() {
        return Err(Error::InvalidAddress(address.to_owned()));
    }
    let raw = format!("http://{}{DATA_PATH}", model::url_host(address.trim()));
    Url::parse(&raw).map_err(|e| Error::InvalidAddress(format!("{address}: {e}")))
}

fn id_from_address(address: &str) -> String {
    address
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_owned()
}
