//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod add;
pub mod config_cmd;
pub mod devices;
pub mod discover;
pub mod fetch;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a configuration-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: &mut Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Discover(args) => discover::handle(settings, args, global).await,
        Command::Add(args) => add::handle(settings, args, global).await,
        Command::Devices(args) => devices::handle(settings, args, global),
        Command::Fetch(args) => fetch::handle(settings, args, global).await,
        Command::Watch(args) => watch::handle(settings, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command reached dispatch without a handler".into(),
        )),
    }
}
