//! Configuration for fallwatch front-ends.
//!
//! TOML profiles, API key resolution (env + keyring + plaintext), and
//! translation to `fallwatch_core::MonitorConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fallwatch_core::{MonitorConfig, TlsVerification};

/// Keyring service name under which API keys are stored.
pub const KEYRING_SERVICE: &str = "fallwatch";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "FALLWATCH_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named sensor-service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The profile name to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout. Clamped to the polling period at runtime.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Polling period for both loops.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout_ms() -> u64 {
    1000
}
fn default_interval_ms() -> u64 {
    1000
}

/// A named sensor-service profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Service root (e.g., "http://gateway:8090").
    pub base_url: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Override polling period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

impl Profile {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_key_env: None,
            ca_cert: None,
            insecure: None,
            timeout_ms: None,
            interval_ms: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$FALLWATCH_CONFIG`, else the
/// platform config dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "fallwatch", "fallwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fallwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, merged with `FALLWATCH_`-prefixed env vars.
///
/// Nested keys use a double underscore:
/// `FALLWATCH_DEFAULTS__TIMEOUT_MS=500`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FALLWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/api-key"),
    )?)
}

/// Store an API key for `profile_name` in the system keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

fn keyring_lookup(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_api_key_with(profile, profile_name, keyring_lookup)
}

/// [`resolve_api_key`] with an explicit keyring lookup.
pub fn resolve_api_key_with(
    profile: &Profile,
    profile_name: &str,
    keyring: impl FnOnce(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(val) = profile
        .api_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring(profile_name) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Parse a service base URL, requiring an http(s) scheme.
pub fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("expected http or https, got '{other}'"),
        }),
    }
}

/// Build a `MonitorConfig` from a profile, without CLI flag overrides.
///
/// A missing API key is not an error here: read-only monitoring works
/// without one, and submission reports the absence itself.
pub fn profile_to_monitor_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<MonitorConfig, ConfigError> {
    let base_url = parse_base_url(&profile.base_url)?;

    let api_key = match resolve_api_key(profile, profile_name) {
        Ok(key) => Some(key),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let interval = Duration::from_millis(profile.interval_ms.unwrap_or(defaults.interval_ms));
    let timeout = Duration::from_millis(profile.timeout_ms.unwrap_or(defaults.timeout_ms));

    let mut config = MonitorConfig::new(base_url);
    config.api_key = api_key;
    config.tls = tls;
    config.request_timeout = timeout;
    config.stats_interval = interval;
    config.feed_interval = interval;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn no_keyring(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.defaults.timeout_ms, 1000);
        assert_eq!(cfg.active_profile_name(), "default");
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("http://gateway:8090");
        profile.api_key_env = Some("GATEWAY_KEY".into());
        cfg.profiles.insert("lab".into(), profile);
        cfg.default_profile = Some("lab".into());

        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.profile("lab").unwrap().base_url, "http://gateway:8090");
        assert!(matches!(
            loaded.profile("nope"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "home"

                [defaults]
                interval_ms = 2000

                [profiles.home]
                base_url = "http://home:8090"
                "#,
            )?;
            jail.set_env("FALLWATCH_DEFAULTS__TIMEOUT_MS", "250");

            let cfg = load_config_from(&jail.directory().join("config.toml")).unwrap();
            assert_eq!(cfg.active_profile_name(), "home");
            assert_eq!(cfg.defaults.interval_ms, 2000);
            assert_eq!(cfg.defaults.timeout_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn api_key_env_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("FW_TEST_PROFILE_KEY", "from-env");
            let mut profile = Profile::new("http://x");
            profile.api_key_env = Some("FW_TEST_PROFILE_KEY".into());
            profile.api_key = Some("plain".into());

            let key = resolve_api_key_with(&profile, "default", no_keyring).unwrap();
            assert_eq!(key.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn keyring_wins_over_plaintext() {
        let mut profile = Profile::new("http://x");
        profile.api_key = Some("plain".into());

        let key = resolve_api_key_with(&profile, "lab", |name| {
            assert_eq!(name, "lab");
            Some("from-keyring".into())
        })
        .unwrap();
        assert_eq!(key.expose_secret(), "from-keyring");
    }

    #[test]
    fn plaintext_is_last_resort() {
        let mut profile = Profile::new("http://x");
        profile.api_key = Some("plain".into());
        let key = resolve_api_key_with(&profile, "default", no_keyring).unwrap();
        assert_eq!(key.expose_secret(), "plain");

        let bare = Profile::new("http://x");
        assert!(matches!(
            resolve_api_key_with(&bare, "default", no_keyring),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("http://gateway:8090").is_ok());
        assert!(parse_base_url("https://gateway").is_ok());
        assert!(matches!(
            parse_base_url("ftp://gateway"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn profile_maps_to_monitor_config() {
        Jail::expect_with(|jail| {
            jail.set_env("FW_TEST_MONITOR_KEY", "k");
            let mut profile = Profile::new("http://gateway:8090");
            profile.api_key_env = Some("FW_TEST_MONITOR_KEY".into());
            profile.interval_ms = Some(500);
            profile.insecure = Some(true);

            let defaults = Defaults {
                timeout_ms: 5000,
                ..Defaults::default()
            };
            let cfg = profile_to_monitor_config(&profile, "default", &defaults).unwrap();

            assert_eq!(cfg.base_url.as_str(), "http://gateway:8090/");
            assert_eq!(cfg.stats_interval, Duration::from_millis(500));
            assert_eq!(cfg.feed_interval, Duration::from_millis(500));
            assert_eq!(cfg.effective_timeout(), Duration::from_millis(500));
            assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
            assert!(cfg.api_key.is_some());
            Ok(())
        });
    }
}
