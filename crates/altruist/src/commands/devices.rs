//! Saved-device command handlers.

use altruist_core::ConfigEntry;
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&ConfigEntry> for EntryRow {
    fn from(e: &ConfigEntry) -> Self {
        Self {
            id: e.data.id.clone(),
            title: e.title.clone(),
            address: e.data.address.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    settings: &mut Settings,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let entries = settings.config.entries();
            let out = output::render_list(&global.output, &entries, |e| EntryRow::from(e), |e| {
                e.data.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Remove { device } => {
            let found = settings
                .config
                .find_device(&device)
                .ok_or_else(|| CliError::NotFound {
                    identifier: device.clone(),
                })?;

            let prompt = format!("Forget sensor {} at {}?", found.id, found.address);
            if !util::confirm(&prompt, "devices remove", global.yes)? {
                return Ok(());
            }

            settings.config.remove_device(&found.id);
            settings.save()?;
            tracing::info!(id = %found.id, "device removed");
            if !global.quiet {
                eprintln!("Removed sensor {}", found.id);
            }
            Ok(())
        }
    }
}
