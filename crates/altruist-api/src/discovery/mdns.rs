// mDNS-backed ServiceBrowser
//
// The `mdns-sd` daemon resolves instances on its own while browsing. A pump
// task per subscription turns daemon events into `BrowseEvent`s and keeps a
// cache of resolved instances; `resolve` waits on that cache.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{BrowseEvent, ResolvedService, ServiceBrowser, Subscription};
use crate::error::Error;

const EVENT_CHANNEL_SIZE: usize = 64;

/// [`ServiceBrowser`] over a local `mdns-sd` daemon.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    cache: Arc<ResolvedCache>,
    /// Live subscriptions per service type. The daemon keeps one querier per
    /// type, so the browse is only stopped when the last one ends.
    active: Arc<DashMap<String, usize>>,
}

impl MdnsBrowser {
    /// Start a daemon bound to all multicast-capable interfaces.
    pub fn new() -> Result<Self, Error> {
        let daemon = ServiceDaemon::new().map_err(|e| Error::Discovery(e.to_string()))?;
        Ok(Self {
            daemon,
            cache: Arc::new(ResolvedCache::new()),
            active: Arc::new(DashMap::new()),
        })
    }

    /// Stop the daemon. Active subscriptions end.
    pub fn shutdown(&self) {
        if let Err(e) = self.daemon.shutdown() {
            debug!(error = %e, "mdns daemon shutdown");
        }
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl ServiceBrowser for MdnsBrowser {
    fn browse(&self, service_type: &str) -> Result<Subscription, Error> {
        let receiver = {
            let mut count = self.active.entry(service_type.to_owned()).or_insert(0);
            let receiver = self
                .daemon
                .browse(service_type)
                .map_err(|e| Error::Discovery(format!("browse {service_type}: {e}")))?;
            *count += 1;
            receiver
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let daemon = self.daemon.clone();
        let cache = Arc::clone(&self.cache);
        let active = Arc::clone(&self.active);
        let service_type = service_type.to_owned();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut announced: HashSet<String> = HashSet::new();

            loop {
                let event = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    event = receiver.recv_async() => match event {
                        Ok(event) => event,
                        Err(_) => break,
                    },
                };

                if let Some(event) = translate_event(&mut announced, &cache, event) {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }

            release_browse(&daemon, &active, &service_type);
        });

        Ok(Subscription::new(rx, cancel))
    }

    async fn resolve(
        &self,
        _service_type: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<ResolvedService, Error> {
        self.cache.wait_for(name, timeout).await
    }
}

/// Drop one subscription's claim on `service_type`, stopping the daemon
/// browse when it was the last.
fn release_browse(daemon: &ServiceDaemon, active: &DashMap<String, usize>, service_type: &str) {
    let Some(mut count) = active.get_mut(service_type) else {
        return;
    };
    *count = count.saturating_sub(1);
    if *count > 0 {
        debug!(%service_type, remaining = *count, "mdns browse still in use");
        return;
    }
    // The entry lock is held so a concurrent `browse` cannot slip in between
    // the count reaching zero and the stop command.
    if let Err(e) = daemon.stop_browse(service_type) {
        warn!(error = %e, %service_type, "failed to stop mdns browse");
    }
    debug!(%service_type, "mdns browse stopped");
}

// ── Resolved-instance cache ──────────────────────────────────────────

/// Resolved instances by full name, shared by every subscription of one
/// browser.
pub(crate) struct ResolvedCache {
    entries: DashMap<String, ResolvedService>,
    /// Bumped whenever `entries` gains or changes an entry.
    changes: watch::Sender<u64>,
}

impl ResolvedCache {
    pub(crate) fn new() -> Self {
        let (changes, _) = watch::channel(0u64);
        Self {
            entries: DashMap::new(),
            changes,
        }
    }

    /// Fold a fresh resolution into the cache. Returns `true` when an entry
    /// for the name already existed.
    pub(crate) fn upsert(&self, incoming: ResolvedService) -> bool {
        let existed = match self.entries.entry(incoming.name.clone()) {
            Entry::Occupied(mut existing) => {
                let merged = merge_resolved(existing.get(), incoming);
                existing.insert(merged);
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(merge_resolved(&ResolvedService::default(), incoming));
                false
            }
        };
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
        existed
    }

    pub(crate) fn remove(&self, name: &str) {
        self.entries.remove(name);
    }

    pub(crate) fn get(&self, name: &str) -> Option<ResolvedService> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Wait until `name` is cached, for at most `timeout`.
    pub(crate) async fn wait_for(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<ResolvedService, Error> {
        // Subscribe before the first lookup so no insert is missed.
        let mut changes = self.changes.subscribe();

        let lookup = async {
            loop {
                if let Some(service) = self.get(name) {
                    return Ok(service);
                }
                if changes.changed().await.is_err() {
                    return Err(Error::Resolution {
                        name: name.to_owned(),
                        reason: "discovery daemon stopped".into(),
                    });
                }
            }
        };

        tokio::time::timeout(timeout, lookup)
            .await
            .unwrap_or_else(|_| {
                Err(Error::ResolveTimeout {
                    name: name.to_owned(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }
}

// ── Event translation ────────────────────────────────────────────────

/// Apply one daemon event to the cache and map it to the event a
/// subscriber sees, if any. `announced` holds the names this subscription
/// has already reported as added.
fn translate_event(
    announced: &mut HashSet<String>,
    cache: &ResolvedCache,
    event: ServiceEvent,
) -> Option<BrowseEvent> {
    match event {
        ServiceEvent::ServiceFound(_, name) => {
            announced.insert(name.clone()).then_some(BrowseEvent::Added { name })
        }
        ServiceEvent::ServiceResolved(info) => {
            let service = resolved_service(&info);
            let name = service.name.clone();
            let existed = cache.upsert(service);
            if announced.insert(name.clone()) {
                Some(BrowseEvent::Added { name })
            } else if existed {
                Some(BrowseEvent::Updated { name })
            } else {
                None
            }
        }
        ServiceEvent::ServiceRemoved(_, name) => {
            cache.remove(&name);
            announced.remove(&name);
            Some(BrowseEvent::Removed { name })
        }
        _ => None,
    }
}

fn resolved_service(info: &ServiceInfo) -> ResolvedService {
    ResolvedService {
        name: info.get_fullname().to_owned(),
        addresses: info.get_addresses().iter().copied().collect(),
        port: info.get_port(),
        properties: info
            .get_properties()
            .iter()
            .map(|p| (p.key().to_owned(), p.val_str().to_owned()))
            .collect(),
    }
}

/// Combine a cached resolution with a newer one.
///
/// The daemon may report an instance's addresses in several partial
/// batches, so addresses accumulate rather than being replaced. Link-local
/// IPv6 addresses carry no zone here and cannot be dialled over HTTP, so
/// they are dropped. IPv4 sorts first so the "first address" rule picks it.
/// Port and TXT data come from the newer resolution.
fn merge_resolved(previous: &ResolvedService, incoming: ResolvedService) -> ResolvedService {
    let mut addresses: Vec<IpAddr> = previous
        .addresses
        .iter()
        .chain(&incoming.addresses)
        .copied()
        .filter(is_dialable)
        .collect();
    addresses.sort_by_key(|ip| (ip.is_ipv6(), *ip));
    addresses.dedup();

    ResolvedService { addresses, ..incoming }
}

fn is_dialable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(_) => true,
        IpAddr::V6(v6) => !v6.is_unicast_link_local(),
    }
}
