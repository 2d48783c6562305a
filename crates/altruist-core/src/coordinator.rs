// ── Polling coordinator ──
//
// Periodically pulls readings from a `ReadingSource`, publishes them
// through `watch` channels and fans them out to registered observers.
// A failed cycle is recorded in `UpdateStatus` and logged; the loop
// keeps running until `shutdown()`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use altruist_api::{AltruistClient, Reading};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::sensor::MetricObserver;

// ── Reading source ───────────────────────────────────────────────

/// Anything that can produce a batch of readings on demand.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Human-readable label used in logs and errors.
    fn label(&self) -> String;

    async fn fetch_readings(&self) -> Result<Vec<Reading>, altruist_api::Error>;
}

#[async_trait]
impl ReadingSource for AltruistClient {
    fn label(&self) -> String {
        self.device().address.clone()
    }

    async fn fetch_readings(&self) -> Result<Vec<Reading>, altruist_api::Error> {
        self.fetch_data().await
    }
}

// ── Update status ────────────────────────────────────────────────

/// Outcome of the most recent refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateStatus {
    #[default]
    Pending,
    Ok {
        at: DateTime<Utc>,
    },
    Failed {
        at: DateTime<Utc>,
        message: String,
        consecutive_failures: u32,
    },
}

impl UpdateStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Time of the last successful update, if the latest cycle succeeded.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Ok { at } => Some(*at),
            _ => None,
        }
    }

    /// Failure count to record if the next cycle fails.
    fn next_failure_count(&self) -> u32 {
        match self {
            Self::Failed {
                consecutive_failures,
                ..
            } => consecutive_failures.saturating_add(1),
            _ => 1,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Cheaply cloneable handle to a polling loop.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    source: Arc<dyn ReadingSource>,
    interval: Duration,
    data: watch::Sender<Arc<Vec<Reading>>>,
    status: watch::Sender<UpdateStatus>,
    observers: RwLock<Vec<Arc<dyn MetricObserver>>>,
    cancel: CancellationToken,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Does NOT poll -- call
    /// [`first_refresh()`](Self::first_refresh) and [`start()`](Self::start).
    pub fn new(source: Arc<dyn ReadingSource>, interval: Duration) -> Self {
        let (data, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(UpdateStatus::Pending);
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                interval,
                data,
                status,
                observers: RwLock::new(Vec::new()),
                cancel: CancellationToken::new(),
                task_handle: Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Add an observer; it receives every subsequent successful batch.
    pub fn register(&self, observer: Arc<dyn MetricObserver>) {
        debug!(key = observer.key(), "observer registered");
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one cycle: fetch, publish, notify observers.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        match self.inner.source.fetch_readings().await {
            Ok(readings) => {
                let readings = Arc::new(readings);
                debug!(count = readings.len(), "readings refreshed");
                self.inner.data.send_replace(Arc::clone(&readings));

                let observers = self
                    .inner
                    .observers
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                for observer in &observers {
                    observer.on_readings(&readings);
                }

                // Status last: subscribers woken by it see updated observers.
                self.inner
                    .status
                    .send_replace(UpdateStatus::Ok { at: Utc::now() });
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                let message = err.to_string();
                self.inner.status.send_modify(|status| {
                    *status = UpdateStatus::Failed {
                        at: Utc::now(),
                        message,
                        consecutive_failures: status.next_failure_count(),
                    };
                });
                Err(err)
            }
        }
    }

    /// Initial refresh. A failure here means the device is not ready.
    pub async fn first_refresh(&self) -> Result<(), CoreError> {
        self.refresh().await.map_err(|e| CoreError::NotReady {
            address: self.inner.source.label(),
            reason: e.to_string(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the background polling loop. Calling twice is a no-op, and a
    /// zero interval disables polling.
    pub async fn start(&self) {
        let mut handle = self.inner.task_handle.lock().await;
        if handle.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }
        if self.inner.interval.is_zero() {
            debug!("zero polling interval, background refresh disabled");
            return;
        }
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        *handle = Some(tokio::spawn(refresh_task(
            coordinator,
            self.inner.interval,
            cancel,
        )));
        info!(
            source = %self.inner.source.label(),
            interval_secs = self.inner.interval.as_secs(),
            "polling started"
        );
    }

    /// Cancel the loop and wait for it to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(
                    source = %self.inner.source.label(),
                    error = %e,
                    "refresh task ended abnormally"
                );
            }
        }
        info!(source = %self.inner.source.label(), "polling stopped");
    }

    /// `true` once [`shutdown()`](Self::shutdown) has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Observation ──────────────────────────────────────────────

    /// Readings from the last successful cycle.
    pub fn data(&self) -> Arc<Vec<Reading>> {
        Arc::clone(&*self.inner.data.borrow())
    }

    pub fn subscribe_data(&self) -> watch::Receiver<Arc<Vec<Reading>>> {
        self.inner.data.subscribe()
    }

    pub fn status(&self) -> UpdateStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.status.subscribe()
    }
}

// ── Background task ──────────────────────────────────────────────

async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
