// altruist-api: Async Rust client for Altruist air-quality sensors (mDNS discovery + HTTP feed)

pub mod client;
pub mod discovery;
pub mod error;
pub mod model;
pub mod transport;

pub use client::AltruistClient;
pub use discovery::{
    BrowseEvent, Discoverer, DiscoveryRecord, MdnsBrowser, ResolvedService, ServiceBrowser,
    Subscription,
};
pub use error::Error;
pub use model::{DeviceModel, MetricValue, Reading, SensorFeed};
pub use transport::TransportConfig;
