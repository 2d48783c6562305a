//! `altruist fetch`: read current measurements once.

use altruist_api::{AltruistClient, MetricValue, Reading};
use altruist_core::{describe, validate_address};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{FetchArgs, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

// ── Output shapes ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ReadingOut {
    pub value_type: String,
    pub raw: String,
    pub value: Option<MetricValue>,
    pub name: Option<&'static str>,
    pub unit: Option<&'static str>,
}

impl From<Reading> for ReadingOut {
    fn from(r: Reading) -> Self {
        let description = describe(&r.value_type);
        Self {
            value: r.metric_value(),
            name: description.map(|d| d.name),
            unit: description.and_then(|d| d.unit),
            value_type: r.value_type,
            raw: r.value,
        }
    }
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Type")]
    value_type: String,
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

impl From<&ReadingOut> for ReadingRow {
    fn from(r: &ReadingOut) -> Self {
        Self {
            value_type: r.value_type.clone(),
            name: r.name.unwrap_or("-").into(),
            value: r.value.map_or_else(|| r.raw.clone(), |v| v.to_string()),
            unit: r.unit.unwrap_or("").into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &Settings,
    args: FetchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let http = settings.transport().build_client()?;

    let client = if let Some(address) = args.address.as_deref() {
        let address = validate_address(address)?;
        AltruistClient::from_address(http, &address).await?
    } else {
        let device = settings.resolve_device(args.device.as_deref())?;
        AltruistClient::new(http, device.device())?
    };

    tracing::debug!(url = %client.data_url(), "fetching readings");
    let readings: Vec<ReadingOut> = client
        .fetch_data()
        .await?
        .into_iter()
        .map(ReadingOut::from)
        .collect();

    let out = output::render_list(&global.output, &readings, |r| ReadingRow::from(r), |r| {
        format!("{}={}", r.value_type, r.raw)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
