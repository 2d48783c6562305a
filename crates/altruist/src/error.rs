//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use altruist_config::ConfigError;
use altruist_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Discovery & setup ────────────────────────────────────────────
    #[error("No Altruist sensors found on the network")]
    #[diagnostic(
        code(altruist::no_devices_found),
        help(
            "Make sure the sensor is powered and on the same network segment,\n\
             and that multicast (mDNS) traffic is not blocked.\n\
             Or add it directly: altruist add <ip-address>"
        )
    )]
    NoDevicesFound,

    #[error("No Altruist sensor answered at {address}")]
    #[diagnostic(
        code(altruist::no_device_found),
        help(
            "Check the address and that the sensor's web page opens at http://{address}/.\n\
             Try: altruist discover"
        )
    )]
    NoDeviceFound { address: String },

    #[error("'{address}' is not an IP address")]
    #[diagnostic(
        code(altruist::invalid_address),
        help("Use a literal IPv4 or IPv6 address, optionally with :port.")
    )]
    InvalidAddress { address: String },

    #[error("Sensor {id} is already configured")]
    #[diagnostic(
        code(altruist::already_configured),
        help("Run: altruist devices list")
    )]
    AlreadyConfigured { id: String },

    #[error("Sensor at {address} is not ready")]
    #[diagnostic(code(altruist::not_ready), help("{reason}"))]
    NotReady { address: String, reason: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Could not reach sensor at {url}")]
    #[diagnostic(code(altruist::unreachable), help("{reason}"))]
    Unreachable { url: String, reason: String },

    #[error("Sensor at {url} sent an unexpected response: {message}")]
    #[diagnostic(code(altruist::malformed_response))]
    MalformedResponse { url: String, message: String },

    #[error("Service discovery failed: {message}")]
    #[diagnostic(code(altruist::discovery))]
    Discovery { message: String },

    // ── Saved devices ────────────────────────────────────────────────
    #[error("Sensor '{identifier}' not found in configuration")]
    #[diagnostic(
        code(altruist::not_found),
        help("Run: altruist devices list to see saved sensors")
    )]
    NotFound { identifier: String },

    #[error("No sensors configured")]
    #[diagnostic(
        code(altruist::no_devices_configured),
        help("Add one with: altruist discover --add\n or: altruist add <ip-address>")
    )]
    NoDevicesConfigured,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(altruist::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(altruist::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error at {path}")]
    #[diagnostic(code(altruist::config))]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── IO / Serialization / Internal ────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render {format} output: {message}")]
    #[diagnostic(code(altruist::render))]
    Render { format: String, message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(altruist::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDeviceFound { .. } | Self::NotReady { .. } | Self::Unreachable { .. } => {
                exit_code::CONNECTION
            }
            Self::NoDevicesFound | Self::NotFound { .. } | Self::NoDevicesConfigured => {
                exit_code::NOT_FOUND
            }
            Self::AlreadyConfigured { .. } => exit_code::CONFLICT,
            Self::InvalidAddress { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn config(path: &std::path::Path, source: ConfigError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoDevicesFound => CliError::NoDevicesFound,
            CoreError::NoDeviceFound { address } => CliError::NoDeviceFound { address },
            CoreError::InvalidAddress { address } => CliError::InvalidAddress { address },
            CoreError::AlreadyConfigured { id } => CliError::AlreadyConfigured { id },
            CoreError::NotReady { address, reason } => CliError::NotReady { address, reason },
            CoreError::DeviceUnreachable { url, reason, .. } => {
                CliError::Unreachable { url, reason }
            }
            CoreError::MalformedResponse { url, message } => {
                CliError::MalformedResponse { url, message }
            }
            CoreError::Discovery { message } => CliError::Discovery { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<altruist_api::Error> for CliError {
    fn from(err: altruist_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
