//! `altruist add <address>`: manual setup.

use altruist_core::setup_manual;

use crate::cli::{AddArgs, GlobalOpts, OutputFormat};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    settings: &mut Settings,
    args: AddArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let configured = settings.configured();
    let entry = setup_manual(&settings.transport(), &args.address, &configured).await?;

    settings.config.add_entry(entry.clone());
    settings.save()?;

    let out = output::render_single(
        &global.output,
        &entry,
        |e| {
            let color = output::should_color(&global.color);
            format!(
                "{} {} ({})",
                output::success("Added", color),
                e.title,
                output::dim(&e.data.id, color)
            )
        },
        |e| e.data.id.clone(),
    )?;
    if matches!(global.output, OutputFormat::Table) {
        if !global.quiet {
            eprintln!("{out}");
        }
    } else {
        output::print_output(&out, global.quiet);
    }
    Ok(())
}
