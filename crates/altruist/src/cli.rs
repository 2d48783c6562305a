//! Clap derive structures for the `altruist` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// altruist -- discover and read Altruist air-quality sensors
#[derive(Debug, Parser)]
#[command(
    name = "altruist",
    version,
    about = "Discover and read Altruist air-quality sensors on your network",
    long_about = "Finds Altruist sensors via mDNS (_altruist._tcp), saves them to a\n\
        local configuration, and reads their particulate, climate and noise\n\
        measurements over the device's local HTTP feed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the configuration file
    #[arg(long, env = "ALTRUIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ALTRUIST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// HTTP request timeout in seconds (overrides config)
    #[arg(long, env = "ALTRUIST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find sensors advertising on the local network
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Add a sensor by IP address
    Add(AddArgs),

    /// Manage saved sensors
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Read current measurements once
    Fetch(FetchArgs),

    /// Poll a sensor and print every update
    Watch(WatchArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Discover ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Collection window in milliseconds (overrides config)
    #[arg(long, short = 'w')]
    pub window: Option<u64>,

    /// Offer to save every newly found sensor
    #[arg(long, short = 'a')]
    pub add: bool,
}

// ── Add ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AddArgs {
    /// IP address of the sensor, optionally with :port
    pub address: String,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List saved sensors
    #[command(alias = "ls")]
    List,

    /// Forget a saved sensor
    #[command(alias = "rm")]
    Remove {
        /// Device id or address
        device: String,
    },
}

// ── Fetch / Watch ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Saved device id or address (defaults to the only saved sensor)
    #[arg(conflicts_with = "address")]
    pub device: Option<String>,

    /// Read from an unsaved sensor at this IP address
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Saved device id or address (defaults to the only saved sensor)
    pub device: Option<String>,

    /// Polling interval in seconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
