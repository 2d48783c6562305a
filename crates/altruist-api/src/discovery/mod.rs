// Local-network discovery of Altruist sensors
//
// A `Discoverer` subscribes to DNS-SD advertisements of the sensor service
// type, resolves each newly announced instance concurrently, and returns
// whatever resolved within a fixed collection window. The network side is
// abstracted behind `ServiceBrowser`; `MdnsBrowser` is the production
// implementation.

mod mdns;

use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::error::Error;
use crate::model::DeviceModel;

pub use mdns::MdnsBrowser;

/// DNS-SD service type advertised by the sensors.
pub const SERVICE_TYPE: &str = "_altruist._tcp.local.";

/// How long a discovery call listens before returning.
pub const COLLECTION_WINDOW: Duration = Duration::from_secs(5);

/// Budget for resolving a single advertisement.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

// ── Browser capability ───────────────────────────────────────────────

/// Advertisement state change delivered by a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEvent {
    Added { name: String },
    Removed { name: String },
    Updated { name: String },
}

/// Fully resolved service instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedService {
    /// Full instance name, e.g. `Altruist-ABC123._altruist._tcp.local.`
    pub name: String,
    pub addresses: Vec<IpAddr>,
    pub port: u16,
    /// TXT record key/value pairs.
    pub properties: BTreeMap<String, String>,
}

/// Live subscription to advertisements of one service type.
///
/// Dropping it unsubscribes: the browser's pump task observes the
/// cancellation and stops browsing.
pub struct Subscription {
    events: mpsc::Receiver<BrowseEvent>,
    _guard: DropGuard,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<BrowseEvent>, cancel: CancellationToken) -> Self {
        Self {
            events,
            _guard: cancel.drop_guard(),
        }
    }

    /// Next event, or `None` once the browser stops producing.
    pub async fn next(&mut self) -> Option<BrowseEvent> {
        self.events.recv().await
    }
}

/// The local-network discovery subsystem as seen by the [`Discoverer`].
#[async_trait]
pub trait ServiceBrowser: Send + Sync {
    /// Subscribe to add/remove/update events for `service_type`.
    fn browse(&self, service_type: &str) -> Result<Subscription, Error>;

    /// Resolve a named advertisement into addresses, port and TXT data.
    async fn resolve(
        &self,
        service_type: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<ResolvedService, Error>;
}

// ── Discovery records ────────────────────────────────────────────────

/// The two shapes in which a device can be learned about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryRecord {
    /// Pushed service info that already carries addresses.
    Announced(ResolvedService),
    /// Browse hit that still needs an explicit resolution.
    Browsed { service_type: String, name: String },
}

impl DiscoveryRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Announced(service) => &service.name,
            Self::Browsed { name, .. } => name,
        }
    }

    /// Turn the record into a device, resolving through `browser` if the
    /// record does not carry an address yet.
    pub async fn resolve(
        self,
        browser: &dyn ServiceBrowser,
        timeout: Duration,
    ) -> Result<DeviceModel, Error> {
        let service = match self {
            Self::Announced(service) => service,
            Self::Browsed { service_type, name } => {
                browser.resolve(&service_type, &name, timeout).await?
            }
        };
        DeviceModel::from_service(&service.name, &service.addresses)
    }
}

impl TryFrom<&ResolvedService> for DeviceModel {
    type Error = Error;

    fn try_from(service: &ResolvedService) -> Result<Self, Self::Error> {
        DeviceModel::from_service(&service.name, &service.addresses)
    }
}

// ── Discoverer ───────────────────────────────────────────────────────

/// Finds sensors currently advertising on the local network.
#[derive(Clone)]
pub struct Discoverer {
    browser: Arc<dyn ServiceBrowser>,
    service_type: String,
    collection_window: Duration,
    resolve_timeout: Duration,
}

impl Discoverer {
    pub fn new(browser: Arc<dyn ServiceBrowser>) -> Self {
        Self {
            browser,
            service_type: SERVICE_TYPE.to_owned(),
            collection_window: COLLECTION_WINDOW,
            resolve_timeout: RESOLVE_TIMEOUT,
        }
    }

    pub fn with_collection_window(mut self, window: Duration) -> Self {
        self.collection_window = window;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn collection_window(&self) -> Duration {
        self.collection_window
    }

    /// Listen for one collection window and return every device that
    /// resolved in time.
    ///
    /// Resolution failures drop only the affected advertisement. An empty
    /// result is not an error. Dropping the returned future aborts all
    /// in-flight resolutions.
    pub async fn get_devices(&self) -> Result<Vec<DeviceModel>, Error> {
        let mut subscription = self.browser.browse(&self.service_type)?;
        let window = tokio::time::sleep_until(Instant::now() + self.collection_window);
        tokio::pin!(window);

        let mut seen: HashSet<String> = HashSet::new();
        let mut devices: Vec<DeviceModel> = Vec::new();
        let mut resolutions: JoinSet<Result<DeviceModel, Error>> = JoinSet::new();
        let mut browsing = true;

        loop {
            tokio::select! {
                () = &mut window => break,

                event = subscription.next(), if browsing => match event {
                    Some(BrowseEvent::Added { name }) => {
                        debug!(%name, "advertisement added");
                        if seen.insert(name.clone()) {
                            self.spawn_resolution(&mut resolutions, name);
                        }
                    }
                    Some(other) => debug!(event = ?other, "ignoring advertisement change"),
                    None => browsing = false,
                },

                Some(joined) = resolutions.join_next(), if !resolutions.is_empty() => match joined {
                    Ok(Ok(device)) => {
                        debug!(id = %device.id, address = %device.address, "added device");
                        devices.push(device);
                    }
                    Ok(Err(e)) => debug!(error = %e, "dropping unresolved advertisement"),
                    Err(e) => debug!(error = %e, "resolution task did not complete"),
                },
            }
        }

        drop(subscription);
        resolutions.abort_all();

        info!(count = devices.len(), "discovery window closed");
        Ok(devices)
    }

    fn spawn_resolution(
        &self,
        resolutions: &mut JoinSet<Result<DeviceModel, Error>>,
        name: String,
    ) {
        let browser = Arc::clone(&self.browser);
        let timeout = self.resolve_timeout;
        let record = DiscoveryRecord::Browsed {
            service_type: self.service_type.clone(),
            name,
        };

        resolutions.spawn(async move {
            let name = record.name().to_owned();
            tokio::time::timeout(timeout, record.resolve(browser.as_ref(), timeout))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::ResolveTimeout {
                        name,
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })
                })
        });
    }
}
