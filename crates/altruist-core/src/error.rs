// ── Core error types ──
//
// Setup and polling errors from altruist-core. Consumers see the
// distinctions that matter to them ("no device found", "not ready",
// "already configured") rather than raw HTTP or JSON failures. The
// `From<altruist_api::Error>` impl translates transport-layer errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup errors ─────────────────────────────────────────────────
    #[error("No Altruist devices found on the network")]
    NoDevicesFound,

    #[error("No Altruist device found at {address}")]
    NoDeviceFound { address: String },

    #[error("Invalid IP address: {address}")]
    InvalidAddress { address: String },

    #[error("Device {id} is already configured")]
    AlreadyConfigured { id: String },

    #[error("Device at {address} is not ready: {reason}")]
    NotReady { address: String, reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device unreachable at {url}: {reason}")]
    DeviceUnreachable {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Service discovery failed: {message}")]
    Discovery { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<altruist_api::Error> for CoreError {
    fn from(err: altruist_api::Error) -> Self {
        match err {
            altruist_api::Error::DeviceUnreachable {
                url,
                status,
                reason,
            } => CoreError::DeviceUnreachable {
                url,
                status,
                reason,
            },
            altruist_api::Error::MalformedResponse { url, message, body: _ } => {
                CoreError::MalformedResponse { url, message }
            }
            altruist_api::Error::InvalidAddress(address) => CoreError::InvalidAddress { address },
            altruist_api::Error::Resolution { name, reason } => CoreError::Discovery {
                message: format!("failed to resolve {name}: {reason}"),
            },
            altruist_api::Error::ResolveTimeout { name, timeout_ms } => CoreError::Discovery {
                message: format!("resolution of {name} timed out after {timeout_ms}ms"),
            },
            altruist_api::Error::Discovery(message) => CoreError::Discovery { message },
            altruist_api::Error::Client(message) => CoreError::Config { message },
        }
    }
}

impl CoreError {
    /// Returns `true` for failures a later polling cycle may clear.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeviceUnreachable { status, .. } => status.is_none_or(|s| s >= 500),
            Self::NotReady { .. } => true,
            _ => false,
        }
    }
}
