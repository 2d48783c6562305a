// Coordinator tests against a scripted ReadingSource on paused time.
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use altruist_core::{
    Coordinator, CoreError, DeviceModel, MetricSensor, MetricValue, Reading, ReadingSource,
    UpdateStatus, describe,
};

const INTERVAL: Duration = Duration::from_secs(15);

// ── Scripted source ─────────────────────────────────────────────────

type Outcome = Result<Vec<Reading>, altruist_api::Error>;

#[derive(Default)]
struct ScriptedSource {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingSource for ScriptedSource {
    fn label(&self) -> String {
        "scripted".into()
    }

    async fn fetch_readings(&self) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn unreachable() -> altruist_api::Error {
    altruist_api::Error::DeviceUnreachable {
        url: "http://192.168.1.20/data.json".into(),
        status: Some(500),
        reason: "HTTP 500".into(),
    }
}

fn readings(pm25: &str) -> Vec<Reading> {
    vec![Reading::new("SDS_P2", pm25), Reading::new("signal", "-61")]
}

fn pm25_sensor() -> Arc<MetricSensor> {
    Arc::new(MetricSensor::new(
        &DeviceModel::new("ABC123", "192.168.1.20"),
        describe("SDS_P2").unwrap(),
    ))
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_publishes_data_and_notifies_observers() {
    let source = ScriptedSource::new(vec![Ok(readings("12.5"))]);
    let coordinator = Coordinator::new(source.clone(), INTERVAL);
    let sensor = pm25_sensor();
    coordinator.register(sensor.clone());

    coordinator.refresh().await.unwrap();

    assert_eq!(*coordinator.data(), readings("12.5"));
    assert!(coordinator.status().is_ok());
    assert_eq!(sensor.native_value(), Some(MetricValue::Float(12.5)));
}

#[tokio::test]
async fn test_failed_refresh_is_recorded_and_keeps_old_data() {
    let source = ScriptedSource::new(vec![Ok(readings("3.0")), Err(unreachable()), Err(unreachable())]);
    let coordinator = Coordinator::new(source.clone(), INTERVAL);

    coordinator.refresh().await.unwrap();
    assert!(coordinator.refresh().await.is_err());
    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, CoreError::DeviceUnreachable { status: Some(500), .. }));
    assert_eq!(*coordinator.data(), readings("3.0"));
    match coordinator.status() {
        UpdateStatus::Failed {
            consecutive_failures,
            message,
            ..
        } => {
            assert_eq!(consecutive_failures, 2);
            assert!(message.contains("HTTP 500"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_refresh_failure_is_not_ready() {
    let source = ScriptedSource::new(vec![Err(unreachable())]);
    let coordinator = Coordinator::new(source, INTERVAL);

    let err = coordinator.first_refresh().await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { ref address, .. } if address == "scripted"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_does_not_stop_the_next() {
    let source = ScriptedSource::new(vec![
        Ok(readings("1.5")),
        Err(unreachable()),
        Ok(readings("7.25")),
    ]);
    let coordinator = Coordinator::new(source.clone(), INTERVAL);
    let sensor = pm25_sensor();
    coordinator.register(sensor.clone());

    coordinator.first_refresh().await.unwrap();
    coordinator.start().await;

    // First periodic cycle fails.
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 2);
    assert!(matches!(coordinator.status(), UpdateStatus::Failed { .. }));
    assert_eq!(sensor.native_value(), Some(MetricValue::Float(1.5)));

    // Second periodic cycle recovers.
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(source.calls(), 3);
    assert!(coordinator.status().is_ok());
    assert_eq!(sensor.native_value(), Some(MetricValue::Float(7.25)));

    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_the_loop() {
    let source = ScriptedSource::new(vec![]);
    let coordinator = Coordinator::new(source.clone(), INTERVAL);

    coordinator.start().await;
    coordinator.start().await;
    tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 2);

    coordinator.shutdown().await;
    assert!(coordinator.is_shut_down());

    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(source.calls(), 2);

    // A shut-down coordinator does not restart.
    coordinator.start().await;
    tokio::time::sleep(INTERVAL * 2).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_status_subscribers_are_notified() {
    let source = ScriptedSource::new(vec![Ok(readings("1.0"))]);
    let coordinator = Coordinator::new(source, INTERVAL);
    let mut status = coordinator.subscribe_status();
    assert_eq!(*status.borrow(), UpdateStatus::Pending);

    coordinator.refresh().await.unwrap();

    status.changed().await.unwrap();
    assert!(status.borrow().last_success().is_some());
}

struct PanickingSource;

#[async_trait]
impl ReadingSource for PanickingSource {
    fn label(&self) -> String {
        "panicking".into()
    }

    async fn fetch_readings(&self) -> Outcome {
        panic!("sensor driver bug");
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_survives_a_panicked_refresh_task() {
    let coordinator = Coordinator::new(Arc::new(PanickingSource), INTERVAL);
    coordinator.start().await;
    // The first periodic tick panics inside the spawned task.
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;

    coordinator.shutdown().await;
    assert!(coordinator.is_shut_down());
}
