//! `altruist discover`: one mDNS collection window.

use std::sync::Arc;
use std::time::Duration;

use altruist_api::{Discoverer, MdnsBrowser};
use altruist_core::{CoreError, DeviceModel, scan, setup_scanned};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct Discovered {
    #[serde(flatten)]
    device: DeviceModel,
    configured: bool,
}

#[derive(Tabled)]
struct DiscoveredRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Saved")]
    saved: String,
}

impl From<&Discovered> for DiscoveredRow {
    fn from(d: &Discovered) -> Self {
        Self {
            id: d.device.id.clone(),
            address: d.device.address.clone(),
            saved: if d.configured { "yes" } else { "-" }.into(),
        }
    }
}

fn spinner(quiet: bool, window: Duration) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(format!(
        "Listening for Altruist sensors ({:.1}s)...",
        window.as_secs_f64()
    ));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &mut Settings,
    args: DiscoverArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut timing = settings.discovery();
    if let Some(ms) = args.window {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "window".into(),
                reason: "must be greater than zero".into(),
            });
        }
        timing.collection_window = Duration::from_millis(ms);
    }

    let browser = MdnsBrowser::new()?;
    let discoverer = Discoverer::new(Arc::new(browser))
        .with_collection_window(timing.collection_window)
        .with_resolve_timeout(timing.resolve_timeout);

    let bar = spinner(global.quiet, timing.collection_window);
    let result = scan(&discoverer).await;
    bar.finish_and_clear();
    let devices = result?;

    let configured = settings.configured();
    let found: Vec<Discovered> = devices
        .into_iter()
        .map(|device| Discovered {
            configured: configured.iter().any(|c| c.id == device.id),
            device,
        })
        .collect();

    let out = output::render_list(&global.output, &found, |d| DiscoveredRow::from(d), |d| {
        format!("{}\t{}", d.device.id, d.device.address)
    })?;
    output::print_output(&out, global.quiet);

    if args.add {
        add_new(settings, &found, global)?;
    }
    Ok(())
}

fn add_new(
    settings: &mut Settings,
    found: &[Discovered],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut added = 0usize;
    for d in found.iter().filter(|d| !d.configured) {
        let pending = match setup_scanned(d.device.clone(), &settings.configured()) {
            Ok(pending) => pending,
            Err(CoreError::AlreadyConfigured { .. }) => continue,
            Err(e) => return Err(e.into()),
        };
        let prompt = format!("Add {} at {}?", pending.title(), d.device.address);
        if !util::confirm(&prompt, "discover --add", global.yes)? {
            continue;
        }
        settings.config.add_entry(pending.confirm());
        added += 1;
    }

    if added > 0 {
        settings.save()?;
    }
    if !global.quiet {
        eprintln!("Saved {added} new sensor(s) to {}", settings.path.display());
    }
    Ok(())
}
