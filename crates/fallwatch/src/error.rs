//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fallwatch_config::ConfigError;
use fallwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INVARIANT: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the sensor service")]
    #[diagnostic(
        code(fallwatch::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Cause: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(fallwatch::timeout),
        help("Raise --interval-ms (the timeout never exceeds it) or check service load.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The service rejected the API key (HTTP {status})")]
    #[diagnostic(
        code(fallwatch::auth_failed),
        help("Verify the key, then store it with: fallwatch config set-key --profile {profile}")
    )]
    AuthFailed { status: u16, profile: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(fallwatch::no_credentials),
        help(
            "Submitting a fall report needs a key.\n\
             Pass --api-key, set FALLWATCH_API_KEY, or run: fallwatch config set-key"
        )
    )]
    NoCredentials { profile: String },

    // ── Service ──────────────────────────────────────────────────────
    #[error("Service error: {message}")]
    #[diagnostic(code(fallwatch::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("Fall report submission failed")]
    #[diagnostic(
        code(fallwatch::submit_failed),
        help("The report was sent once and not retried.")
    )]
    SubmissionFailed {
        #[source]
        source: Box<CliError>,
    },

    #[error("Notification sequence corrupted: {message}")]
    #[diagnostic(
        code(fallwatch::invariant),
        help("The feed loop stopped to avoid emitting out-of-order notifications. Please report this.")
    )]
    InvariantViolation { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fallwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fallwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: fallwatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No sensor service configured")]
    #[diagnostic(
        code(fallwatch::no_config),
        help(
            "Pass --base-url, set FALLWATCH_BASE_URL, or run: fallwatch config init\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(fallwatch::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(fallwatch::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::InvariantViolation { .. } => exit_code::INVARIANT,
            Self::SubmissionFailed { source } => source.exit_code(),
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to credential errors raised below the CLI.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::NoCredentials { .. } => Self::NoCredentials {
                profile: profile.into(),
            },
            Self::AuthFailed { status, .. } => Self::AuthFailed {
                status,
                profile: profile.into(),
            },
            Self::SubmissionFailed { source } => Self::SubmissionFailed {
                source: Box::new(source.for_profile(profile)),
            },
            other => other,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport {
                message,
                timed_out: true,
            } => CliError::Timeout { message },

            CoreError::Transport { message, .. } => CliError::ConnectionFailed { reason: message },

            CoreError::Protocol {
                status: Some(status @ (401 | 403)),
                ..
            } => CliError::AuthFailed {
                status,
                profile: "default".into(),
            },

            CoreError::Protocol { message, status } => CliError::ApiError { message, status },

            CoreError::InvariantViolation { message } => CliError::InvariantViolation { message },

            CoreError::SubmissionFailed { source } => CliError::SubmissionFailed {
                source: Box::new(CliError::from(*source)),
            },

            CoreError::MissingApiKey => CliError::NoCredentials {
                profile: "default".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
