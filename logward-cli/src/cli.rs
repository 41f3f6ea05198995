//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Logward -- validated, read-only access to the Windows event log.
///
/// Use `logward <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logward", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logward.toml configuration file.
    #[arg(short, long, default_value = "logward.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the allowlisted channels and their availability.
    Channels(ChannelsArgs),

    /// Run a validated query against one channel.
    Query(QueryArgs),

    /// Scan the allowlisted channels for incident signals.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- channels ----

/// List allowlisted channels with record counts.
#[derive(Args, Debug)]
pub struct ChannelsArgs {}

// ---- query ----

/// Validate and execute a single event query.
///
/// The channel name must match the allowlist exactly; the filter is
/// restricted to the safe XPath subset.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Channel to query (Application or System, case-sensitive).
    pub channel: String,

    /// XPath filter expression (safe subset only).
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Window start, ISO-8601 (e.g. 2024-03-15T00:00:00Z).
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, ISO-8601.
    #[arg(long)]
    pub end: Option<String>,

    /// Maximum number of records to return (clamped to the configured cap).
    #[arg(short = 'n', long)]
    pub max_results: Option<u32>,
}

// ---- scan ----

/// Scan for crash/incident signals across the allowlisted channels.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Hours to look back from now (clamped to the configured maximum).
    #[arg(long, default_value_t = 24)]
    pub hours: u32,

    /// Only report signals at or above this severity (medium, high, critical).
    #[arg(long)]
    pub min_severity: Option<String>,

    /// Exit with a non-zero status if any Critical signal is found.
    #[arg(long)]
    pub fail_on_critical: bool,
}

// ---- config ----

/// Manage configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Load and display the effective configuration.
    Show {
        /// Section to display (general, query, audit, source).
        #[arg(long)]
        section: Option<String>,
    },
    /// Validate the configuration file without running anything.
    Validate,
}
