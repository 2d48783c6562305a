// Shared transport configuration for building reqwest::Client instances.
//
// Sensors speak plain HTTP on the local network, so the only knobs are the
// request timeout and the user agent.

use std::time::Duration;

/// Default per-request timeout for the data feed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("altruist-api/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Config with a custom timeout and the default user agent.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// A zero timeout is rejected.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        if self.timeout.is_zero() {
            return Err(crate::error::Error::Client(
                "request timeout must be greater than zero".into(),
            ));
        }

        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| crate::error::Error::Client(format!("failed to build HTTP client: {e}")))
    }
}
