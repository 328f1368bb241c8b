//! CLI configuration: a thin wrapper around `fallwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--base-url, --api-key, --insecure, --timeout-ms, --interval-ms).

use std::time::Duration;

use secrecy::SecretString;

use fallwatch_core::{MonitorConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use fallwatch_config::{
    Config, Profile, config_path, load_config, load_config_or_default, parse_base_url,
    save_config, store_api_key,
};

/// A fully resolved monitor configuration and the profile it came from.
pub struct Resolved {
    pub profile_name: String,
    pub monitor: MonitorConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// `"a, b"` or `"(none)"` for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build a `MonitorConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--base-url` alone is enough; an explicitly
/// requested `--profile` must exist.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut monitor = if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut monitor =
            fallwatch_config::profile_to_monitor_config(profile, &profile_name, &cfg.defaults)?;
        if let Some(ref url) = global.base_url {
            monitor.base_url = parse_base_url(url)?;
        }
        monitor
    } else if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    } else {
        let url = global.base_url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        let mut monitor = MonitorConfig::new(parse_base_url(url)?);
        let interval = Duration::from_millis(cfg.defaults.interval_ms);
        monitor.request_timeout = Duration::from_millis(cfg.defaults.timeout_ms);
        monitor.stats_interval = interval;
        monitor.feed_interval = interval;
        if cfg.defaults.insecure {
            monitor.tls = TlsVerification::DangerAcceptInvalid;
        }
        monitor
    };

    apply_overrides(&mut monitor, global);
    validate(&monitor)?;

    Ok(Resolved {
        profile_name,
        monitor,
    })
}

/// CLI flags take priority over profile values.
fn apply_overrides(monitor: &mut MonitorConfig, global: &GlobalOpts) {
    if let Some(ref key) = global.api_key {
        monitor.api_key = Some(SecretString::from(key.clone()));
    }
    if global.insecure {
        monitor.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(ms) = global.timeout_ms {
        monitor.request_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = global.interval_ms {
        monitor.stats_interval = Duration::from_millis(ms);
        monitor.feed_interval = Duration::from_millis(ms);
    }
}

fn validate(monitor: &MonitorConfig) -> Result<(), CliError> {
    if monitor.stats_interval.is_zero() || monitor.feed_interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}
