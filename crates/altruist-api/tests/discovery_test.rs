// Discovery listener tests against a scripted in-memory ServiceBrowser.
//
// All tests run on paused tokio time, so the 5s window and resolution
// delays elapse instantly but stay exactly measurable.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use altruist_api::discovery::{COLLECTION_WINDOW, SERVICE_TYPE};
use altruist_api::{
    BrowseEvent, DeviceModel, Discoverer, DiscoveryRecord, Error, ResolvedService, ServiceBrowser,
    Subscription,
};

// ── Scripted browser ────────────────────────────────────────────────

struct Script {
    /// Events emitted after the given delay from subscription.
    events: Vec<(Duration, BrowseEvent)>,
    /// name -> (resolution delay, result addresses)
    services: HashMap<String, (Duration, Vec<IpAddr>)>,
}

#[derive(Default)]
struct Probe {
    in_flight: AtomicUsize,
    resolve_calls: AtomicUsize,
    subscriptions: Mutex<Vec<CancellationToken>>,
}

struct ScriptedBrowser {
    script: Script,
    probe: Arc<Probe>,
}

struct InFlight(Arc<Probe>);

impl InFlight {
    fn enter(probe: &Arc<Probe>) -> Self {
        probe.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(probe))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ServiceBrowser for ScriptedBrowser {
    fn browse(&self, service_type: &str) -> Result<Subscription, Error> {
        assert_eq!(service_type, SERVICE_TYPE);
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        self.probe.subscriptions.lock().unwrap().push(cancel.clone());

        let events = self.script.events.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            for (at, event) in events {
                tokio::time::sleep_until(start + at).await;
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            // Keep the channel open like a real browser would.
            tx.closed().await;
        });

        Ok(Subscription::new(rx, cancel))
    }

    async fn resolve(
        &self,
        _service_type: &str,
        name: &str,
        _timeout: Duration,
    ) -> Result<ResolvedService, Error> {
        self.probe.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.probe);
        let (delay, addresses) = self.script.services.get(name).cloned().ok_or_else(|| {
            Error::Resolution {
                name: name.to_owned(),
                reason: "unknown instance".into(),
            }
        })?;
        tokio::time::sleep(delay).await;
        Ok(ResolvedService {
            name: name.to_owned(),
            addresses,
            port: 80,
            ..ResolvedService::default()
        })
    }
}

fn added(name: &str) -> BrowseEvent {
    BrowseEvent::Added { name: name.to_owned() }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn discoverer(script: Script) -> (Discoverer, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let browser = ScriptedBrowser {
        script,
        probe: Arc::clone(&probe),
    };
    (Discoverer::new(Arc::new(browser)), probe)
}

fn sorted_ids(devices: &[DeviceModel]) -> Vec<String> {
    let mut ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
    ids.sort();
    ids
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_empty_network_returns_empty_list_after_full_window() {
    let (discoverer, _) = discoverer(Script {
        events: vec![],
        services: HashMap::new(),
    });

    let start = Instant::now();
    let devices = discoverer.get_devices().await.unwrap();
    let elapsed = start.elapsed();

    assert!(devices.is_empty());
    assert!(elapsed >= COLLECTION_WINDOW, "returned early: {elapsed:?}");
    assert!(
        elapsed < COLLECTION_WINDOW + Duration::from_millis(50),
        "returned late: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_resolves_added_advertisements() {
    let (discoverer, _) = discoverer(Script {
        events: vec![(
            Duration::from_millis(100),
            added("Altruist-sensor-ABC123._altruist._tcp.local."),
        )],
        services: HashMap::from([(
            "Altruist-sensor-ABC123._altruist._tcp.local.".to_owned(),
            (Duration::from_millis(200), vec![ip("192.168.1.20")]),
        )]),
    });

    let devices = discoverer.get_devices().await.unwrap();

    assert_eq!(devices, vec![DeviceModel::new("ABC123", "192.168.1.20")]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolutions_lose_no_entry() {
    let names = ["Altruist-AAA", "Altruist-BBB", "Altruist-CCC"];
    let (discoverer, _) = discoverer(Script {
        events: names
            .iter()
            .map(|n| (Duration::from_millis(10), added(n)))
            .collect(),
        services: names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                // Identical delays: every resolution completes on the same tick.
                ((*n).to_owned(), (Duration::from_secs(1), vec![ip(&format!("10.0.0.{i}"))]))
            })
            .collect(),
    });

    let devices = discoverer.get_devices().await.unwrap();

    assert_eq!(sorted_ids(&devices), vec!["AAA", "BBB", "CCC"]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_resolution_is_absent_and_others_survive() {
    let (discoverer, probe) = discoverer(Script {
        events: vec![
            (Duration::ZERO, added("Altruist-SLOW")),
            (Duration::ZERO, added("Altruist-FAST")),
            (Duration::ZERO, added("Altruist-GONE")),
        ],
        services: HashMap::from([
            ("Altruist-SLOW".to_owned(), (Duration::from_secs(4), vec![ip("10.0.0.1")])),
            ("Altruist-FAST".to_owned(), (Duration::from_millis(50), vec![ip("10.0.0.2")])),
            // GONE is unknown to the browser: resolution fails outright.
        ]),
    });

    let devices = discoverer.get_devices().await.unwrap();

    assert_eq!(sorted_ids(&devices), vec!["FAST"]);
    assert_eq!(probe.resolve_calls.load(Ordering::SeqCst), 3);
    assert_eq!(probe.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_records_without_address_are_dropped() {
    let (discoverer, _) = discoverer(Script {
        events: vec![(Duration::ZERO, added("Altruist-NOADDR"))],
        services: HashMap::from([(
            "Altruist-NOADDR".to_owned(),
            (Duration::from_millis(10), vec![]),
        )]),
    });

    assert!(discoverer.get_devices().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_removed_updated_and_duplicates_are_ignored() {
    let (discoverer, probe) = discoverer(Script {
        events: vec![
            (Duration::ZERO, added("Altruist-ONE")),
            (Duration::from_millis(5), added("Altruist-ONE")),
            (Duration::from_millis(5), BrowseEvent::Updated { name: "Altruist-ONE".into() }),
            (Duration::from_millis(5), BrowseEvent::Removed { name: "Altruist-TWO".into() }),
        ],
        services: HashMap::from([
            ("Altruist-ONE".to_owned(), (Duration::from_millis(10), vec![ip("10.0.0.1")])),
            ("Altruist-TWO".to_owned(), (Duration::from_millis(10), vec![ip("10.0.0.2")])),
        ]),
    });

    let devices = discoverer.get_devices().await.unwrap();

    assert_eq!(sorted_ids(&devices), vec!["ONE"]);
    assert_eq!(probe.resolve_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_window_close_aborts_in_flight_and_unsubscribes() {
    let (discoverer, probe) = discoverer(Script {
        events: vec![(Duration::from_millis(4_900), added("Altruist-LATE"))],
        services: HashMap::from([(
            "Altruist-LATE".to_owned(),
            (Duration::from_secs(2), vec![ip("10.0.0.9")]),
        )]),
    });

    let devices = discoverer.get_devices().await.unwrap();

    assert!(devices.is_empty());
    // Let the runtime process the aborts.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(probe.in_flight.load(Ordering::SeqCst), 0);
    let subs = probe.subscriptions.lock().unwrap();
    assert_eq!(subs.len(), 1);
    assert!(subs[0].is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_discovery_cancels_resolutions() {
    let (discoverer, probe) = discoverer(Script {
        events: vec![(Duration::ZERO, added("Altruist-X"))],
        services: HashMap::from([(
            "Altruist-X".to_owned(),
            (Duration::from_secs(2), vec![ip("10.0.0.3")]),
        )]),
    });

    let outcome = tokio::time::timeout(Duration::from_secs(1), discoverer.get_devices()).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(probe.in_flight.load(Ordering::SeqCst), 0);
    assert!(probe.subscriptions.lock().unwrap()[0].is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_custom_window_is_honoured() {
    let (discoverer, _) = discoverer(Script {
        events: vec![],
        services: HashMap::new(),
    });
    let discoverer = discoverer.with_collection_window(Duration::from_millis(500));

    let start = Instant::now();
    discoverer.get_devices().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_secs(1));
}

// ── Discovery records ───────────────────────────────────────────────

#[tokio::test]
async fn test_announced_record_needs_no_resolution() {
    let probe = Arc::new(Probe::default());
    let browser = ScriptedBrowser {
        script: Script {
            events: vec![],
            services: HashMap::new(),
        },
        probe: Arc::clone(&probe),
    };

    let record = DiscoveryRecord::Announced(ResolvedService {
        name: "Altruist-sensor-ABC123._altruist._tcp.local.".into(),
        addresses: vec![ip("192.168.1.44")],
        port: 80,
        ..ResolvedService::default()
    });
    let device = record.resolve(&browser, Duration::from_secs(3)).await.unwrap();

    assert_eq!(device.id, "ABC123");
    assert_eq!(device.address, "192.168.1.44");
    assert_eq!(probe.resolve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_browsed_record_resolves_through_browser() {
    let probe = Arc::new(Probe::default());
    let browser = ScriptedBrowser {
        script: Script {
            events: vec![],
            services: HashMap::from([(
                "Altruist-QQQ._altruist._tcp.local.".to_owned(),
                (Duration::ZERO, vec![ip("fe80::1"), ip("10.1.1.1")]),
            )]),
        },
        probe: Arc::clone(&probe),
    };

    let record = DiscoveryRecord::Browsed {
        service_type: SERVICE_TYPE.into(),
        name: "Altruist-QQQ._altruist._tcp.local.".into(),
    };
    let device = record.resolve(&browser, Duration::from_secs(3)).await.unwrap();

    assert_eq!(device.id, "QQQ");
    assert_eq!(device.address, "fe80::1");
    assert_eq!(probe.resolve_calls.load(Ordering::SeqCst), 1);
}
