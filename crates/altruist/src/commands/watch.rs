//! `altruist watch`: poll one sensor and print every update.

use std::time::Duration;

use altruist_core::{Hub, MetricValue, UpdateStatus};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

// ── Snapshot ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Snapshot {
    at: DateTime<Utc>,
    device_id: String,
    metrics: Vec<MetricOut>,
}

#[derive(Debug, Serialize)]
struct MetricOut {
    unique_id: String,
    key: &'static str,
    name: &'static str,
    value: Option<MetricValue>,
    unit: Option<&'static str>,
}

impl Snapshot {
    fn capture(hub: &Hub, at: DateTime<Utc>) -> Self {
        Self {
            at,
            device_id: hub.device().id.clone(),
            metrics: hub
                .sensors()
                .iter()
                .map(|s| MetricOut {
                    unique_id: s.unique_id().to_owned(),
                    key: s.description().key,
                    name: s.description().name,
                    value: s.native_value(),
                    unit: s.description().unit,
                })
                .collect(),
        }
    }

    fn line(&self, color: bool) -> String {
        let time = self.at.with_timezone(&Local).format("%H:%M:%S").to_string();
        let metrics = self
            .metrics
            .iter()
            .map(|m| {
                let value = m.value.map_or_else(|| "-".to_owned(), |v| v.to_string());
                match m.unit {
                    Some(unit) => format!("{} {value} {unit}", m.name),
                    None => format!("{} {value}", m.name),
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}  {metrics}", output::dim(&time, color))
    }
}

fn render(snapshot: &Snapshot, global: &GlobalOpts, color: bool) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Table => Ok(snapshot.line(color)),
        OutputFormat::Plain => Ok(snapshot.line(false)),
        // compact: one document per line
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(snapshot, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(snapshot)?.trim_end())),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &Settings,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let entry = settings.resolve_device(args.device.as_deref())?;
    let mut polling = settings.polling();
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        polling.interval = Duration::from_secs(secs);
    }
    let color = output::should_color(&global.color);

    let hub = Hub::setup(&entry, &polling).await?;
    if hub.sensors().is_empty() {
        tracing::warn!(id = %entry.id, "sensor reports no known metrics");
    }

    let mut status = hub.coordinator().subscribe_status();
    let first_at = status.borrow_and_update().last_success().unwrap_or_else(Utc::now);
    output::print_output(&render(&Snapshot::capture(&hub, first_at), global, color)?, global.quiet);
    let mut printed: u32 = 1;

    while args.count.is_none_or(|n| printed < n) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current {
                    UpdateStatus::Ok { at } => {
                        let snapshot = Snapshot::capture(&hub, at);
                        output::print_output(&render(&snapshot, global, color)?, global.quiet);
                        printed += 1;
                    }
                    UpdateStatus::Failed { message, consecutive_failures, .. } => {
                        eprintln!(
                            "{}",
                            output::warning(
                                &format!("update failed ({consecutive_failures}x): {message}"),
                                color
                            )
                        );
                    }
                    UpdateStatus::Pending => {}
                }
            }
        }
    }

    hub.unload().await;
    Ok(())
}
