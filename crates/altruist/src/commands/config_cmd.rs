//! Config subcommand handlers.

use altruist_config::config_path;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let settings = Settings::load(global)?;
            let rendered = match global.output {
                OutputFormat::Table | OutputFormat::Plain => output::render_toml(&settings.config)?,
                OutputFormat::Json => output::render_json(&settings.config, false)?,
                OutputFormat::JsonCompact => output::render_json(&settings.config, true)?,
                OutputFormat::Yaml => output::render_yaml(&settings.config)?,
            };
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }
    }
}
