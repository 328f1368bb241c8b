// ── Runtime monitor configuration ──
//
// Describes *where* the sensor service lives and how often to poll it.
// Carries the API key but never touches disk: the CLI (or any other
// front-end) builds a `MonitorConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Default period for every polling loop and for the clock.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed gateways).
    DangerAcceptInvalid,
}

/// Configuration for monitoring a single sensor service.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Service root, e.g. `http://gateway:8090`.
    pub base_url: Url,
    /// Credential sent with manual fall reports. Reads need none.
    pub api_key: Option<SecretString>,
    pub tls: TlsVerification,
    /// Requested per-request timeout. See [`effective_timeout`](Self::effective_timeout).
    pub request_timeout: Duration,
    pub stats_interval: Duration,
    pub feed_interval: Duration,
    pub clock_interval: Duration,
}

impl MonitorConfig {
    /// Config with one-second periods and a one-second request timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            tls: TlsVerification::default(),
            request_timeout: DEFAULT_PERIOD,
            stats_interval: DEFAULT_PERIOD,
            feed_interval: DEFAULT_PERIOD,
            clock_interval: DEFAULT_PERIOD,
        }
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// The timeout actually applied to network calls.
    ///
    /// Never longer than the shortest polling period, so a slow request
    /// cannot build a backlog of ticks. A zero request timeout means
    /// "use the polling period".
    pub fn effective_timeout(&self) -> Duration {
        let period = self.stats_interval.min(self.feed_interval);
        if self.request_timeout.is_zero() || period.is_zero() {
            return period.max(self.request_timeout);
        }
        self.request_timeout.min(period)
    }

    /// Every periodic task needs a non-zero period.
    pub fn validate(&self) -> Result<(), CoreError> {
        let periods = [
            ("stats_interval", self.stats_interval),
            ("feed_interval", self.feed_interval),
            ("clock_interval", self.clock_interval),
        ];
        match periods.iter().find(|(_, period)| period.is_zero()) {
            Some((name, _)) => Err(CoreError::Config {
                message: format!("{name} must be greater than zero"),
            }),
            None => Ok(()),
        }
    }
}
