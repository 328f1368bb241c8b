// ── Core error types ──
//
// Consumers never see reqwest errors or raw status codes directly. The
// `From<fallwatch_api::Error>` impl folds transport-layer failures into
// two buckets: `Transport` (no usable response) and `Protocol` (a
// response arrived but could not be used).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Recoverable on the next tick ─────────────────────────────────
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// The request hit its deadline rather than failing outright.
        timed_out: bool,
    },

    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
    },

    // ── Fatal for the feed loop ──────────────────────────────────────
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    // ── Manual report path ───────────────────────────────────────────
    #[error("Fall report submission failed: {source}")]
    SubmissionFailed {
        #[source]
        source: Box<CoreError>,
    },

    #[error("No API key configured for fall report submission")]
    MissingApiKey,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures a polling loop absorbs and retries on its
    /// next scheduled tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Protocol { .. })
    }

    pub(crate) fn timeout_elapsed(timeout: std::time::Duration) -> Self {
        Self::Transport {
            message: format!("request timed out after {}ms", timeout.as_millis()),
            timed_out: true,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fallwatch_api::Error> for CoreError {
    fn from(err: fallwatch_api::Error) -> Self {
        match err {
            fallwatch_api::Error::Transport(ref e) => CoreError::Transport {
                message: e.url().map_or_else(
                    || e.to_string(),
                    |url| format!("{e} ({url})"),
                ),
                timed_out: e.is_timeout(),
            },
            fallwatch_api::Error::Timeout { timeout_ms } => CoreError::Transport {
                message: format!("request timed out after {timeout_ms}ms"),
                timed_out: true,
            },
            fallwatch_api::Error::Tls(msg) => CoreError::Transport {
                message: format!("TLS error: {msg}"),
                timed_out: false,
            },
            fallwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fallwatch_api::Error::Http { status, body } => CoreError::Protocol {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            fallwatch_api::Error::Deserialization { message, body: _ } => CoreError::Protocol {
                message,
                status: None,
            },
        }
    }
}
