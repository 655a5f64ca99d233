//! CLI arguments and subcommands for herakles-sysmon.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

/// Snapshot output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SnapshotFormat {
    Text,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug, Default)]
#[command(
    name = "herakles-sysmon",
    about = "Host metrics monitor with tiered caching and threshold alerts",
    long_about = "Host metrics monitor with tiered caching and threshold alerts.\n\n\
                  Samples CPU, memory, disk, network, sensors and processes on Linux, \
                  caches each metric class for its own lifetime, and raises alerts when \
                  configured limits are exceeded.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Disable the HTTP status endpoints
    #[arg(long)]
    pub no_http: bool,

    /// Log level (overrides config and SYSTEM_MONITOR_LOG_LEVEL)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// CPU usage alert threshold in percent
    #[arg(long)]
    pub cpu_limit: Option<f64>,

    /// RAM usage alert threshold in percent
    #[arg(long)]
    pub ram_limit: Option<f64>,

    /// Disk usage alert threshold in percent
    #[arg(long)]
    pub disk_limit: Option<f64>,

    /// Seconds between full snapshots in background mode
    #[arg(short = 'i', long)]
    pub interval: Option<f64>,

    /// Number of snapshots kept in history
    #[arg(long)]
    pub history_size: Option<usize>,

    /// Number of processes listed in snapshots
    #[arg(long)]
    pub top_processes: Option<usize>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll in the background and serve status endpoints until interrupted (default)
    Run,

    /// Take one snapshot and print it
    Snapshot {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: SnapshotFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Take one snapshot, evaluate all thresholds and deliver the alerts
    Alerts,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold_flags() {
        let args = Args::parse_from([
            "herakles-sysmon",
            "--cpu-limit",
            "90",
            "--interval",
            "0.5",
            "--no-http",
            "snapshot",
            "--format",
            "json",
        ]);
        assert_eq!(args.cpu_limit, Some(90.0));
        assert_eq!(args.interval, Some(0.5));
        assert!(args.no_http);
        assert!(matches!(
            args.command,
            Some(Commands::Snapshot {
                format: SnapshotFormat::Json,
                pretty: false
            })
        ));
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["herakles-sysmon"]);
        assert!(args.command.is_none());
        assert!(args.log_level.is_none());
        assert!(matches!(args.config_format, ConfigFormat::Yaml));
    }
}
