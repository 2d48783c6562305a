use thiserror::Error;

/// Top-level error type for the `altruist-api` crate.
///
/// Covers every failure mode of the two device-facing surfaces: the HTTP
/// data feed and local-network service discovery. `altruist-core` maps these
/// into setup and polling diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Data feed ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, timeout, or a non-2xx status.
    #[error("Device unreachable at {url}: {reason}")]
    DeviceUnreachable {
        url: String,
        /// HTTP status, when the device answered at all.
        status: Option<u16>,
        reason: String,
    },

    /// 2xx response whose body is not JSON or not a list of readings.
    /// Keeps the raw body for debugging.
    #[error("Malformed response from {url}: {message}")]
    MalformedResponse {
        url: String,
        message: String,
        body: String,
    },

    /// The address is not an IP literal (optionally with a port).
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    // ── Discovery ───────────────────────────────────────────────────
    /// An advertisement could not be turned into a device record.
    #[error("Failed to resolve {name}: {reason}")]
    Resolution { name: String, reason: String },

    /// Resolution did not complete within its budget.
    #[error("Resolution of {name} timed out after {timeout_ms}ms")]
    ResolveTimeout { name: String, timeout_ms: u64 },

    /// The discovery subsystem itself failed (daemon start, browse request).
    #[error("Service discovery failed: {0}")]
    Discovery(String),

    // ── Platform ────────────────────────────────────────────────────
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl Error {
    /// Returns `true` for network failures and non-2xx statuses.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::DeviceUnreachable { .. })
    }

    /// Returns `true` if the device answered with an unusable body.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next polling cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeviceUnreachable { status, .. } => status.is_none_or(|s| s >= 500),
            Self::ResolveTimeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::DeviceUnreachable { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn unreachable(url: &url::Url, err: &reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out".to_owned()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::DeviceUnreachable {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            reason,
        }
    }
}
