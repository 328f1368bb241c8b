//! Clap derive structures for the `fallwatch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use fallwatch_core::Axes;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fallwatch -- live monitor for fall-detection sensor services
#[derive(Debug, Parser)]
#[command(
    name = "fallwatch",
    version,
    about = "Monitor fall-detection sensors from the command line",
    long_about = "Polls a fall-detection service for its device counts and sensor feed,\n\
        reports every newly arrived record as a numbered fall notification,\n\
        and can inject a manual test report.",
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
    /// Service profile to use
    #[arg(long, short = 'p', env = "FALLWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service base URL (overrides profile)
    #[arg(long, short = 'u', env = "FALLWATCH_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API key for fall report submission
    #[arg(long, env = "FALLWATCH_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FALLWATCH_OUTPUT",
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

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "FALLWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in milliseconds (never longer than the poll interval)
    #[arg(long, env = "FALLWATCH_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Polling interval in milliseconds
    #[arg(long, env = "FALLWATCH_INTERVAL_MS", global = true)]
    pub interval_ms: Option<u64>,
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
    /// Poll continuously and print fall notifications as they arrive
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch device counts once
    Stats,

    /// Fetch the sensor feed once
    #[command(alias = "data")]
    Feed(FeedArgs),

    /// Send a manual fall report
    Submit(SubmitArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many fall notifications
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Exit after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Do not print device-count changes
    #[arg(long)]
    pub no_stats: bool,
}

// ── Feed ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Show only the last N records
    #[arg(long, short = 'l')]
    pub last: Option<usize>,
}

// ── Submit ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Device id to report as
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    /// Reading time (defaults to now, `YYYY-MM-DD HH:MM:SS`)
    #[arg(long)]
    pub time: Option<String>,

    /// Accelerometer reading as `x,y,z`
    #[arg(long, value_parser = parse_axes, allow_hyphen_values = true)]
    pub acc: Option<Axes>,

    /// Gyroscope reading as `x,y,z`
    #[arg(long, value_parser = parse_axes, allow_hyphen_values = true)]
    pub gyro: Option<Axes>,
}

/// Parse `x,y,z` into a three-axis sample.
pub fn parse_axes(raw: &str) -> Result<Axes, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected three comma-separated numbers, got '{raw}'"));
    };
    let num = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number"))
    };
    Ok((num(*x)?, num(*y)?, num(*z)?))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// Set a value on the active profile
    Set {
        /// Profile key (base_url, api_key_env, insecure, timeout_ms, interval_ms, ca_cert)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
