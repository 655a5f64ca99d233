//! Configuration management for herakles-sysmon.
//!
//! This module handles loading, merging, and validating configuration from files,
//! environment variables and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use crate::error::ConfigError;
use crate::sinks::SinkConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9215;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix of the environment variables overlaying the config file.
pub const ENV_PREFIX: &str = "SYSTEM_MONITOR_";

/// Enhanced configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Alert thresholds, percent
    #[serde(alias = "cpu-limit")]
    pub cpu_limit: Option<f64>,
    #[serde(alias = "ram-limit")]
    pub ram_limit: Option<f64>,
    #[serde(alias = "disk-limit")]
    pub disk_limit: Option<f64>,

    // Polling
    /// Seconds between full snapshots
    pub interval: Option<f64>,
    #[serde(alias = "history-size")]
    pub history_size: Option<usize>,
    #[serde(alias = "top-processes")]
    pub top_processes: Option<usize>,

    // Logging
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,

    // Server configuration
    pub bind: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "enable-http")]
    pub enable_http: Option<bool>,

    /// Alert destinations; `print` when unset.
    /// Must stay the last field: TOML writes arrays of tables after plain values.
    pub sinks: Option<Vec<SinkConfig>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_limit: Some(crate::alerts::DEFAULT_CPU_LIMIT),
            ram_limit: Some(crate::alerts::DEFAULT_RAM_LIMIT),
            disk_limit: Some(crate::alerts::DEFAULT_DISK_LIMIT),
            interval: Some(crate::monitor::DEFAULT_INTERVAL_SECS),
            history_size: Some(crate::history::DEFAULT_HISTORY_SIZE),
            top_processes: Some(crate::assembler::DEFAULT_TOP_PROCESSES),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
            log_file: None,
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            enable_http: Some(true),
            sinks: Some(vec![SinkConfig::Print]),
        }
    }
}

impl Config {
    /// Configured sinks, or a single print sink when none are set.
    pub fn effective_sinks(&self) -> Vec<SinkConfig> {
        match &self.sinks {
            Some(sinks) if !sinks.is_empty() => sinks.clone(),
            _ => vec![SinkConfig::Print],
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    let limits = [
        ("cpu_limit", cfg.cpu_limit),
        ("ram_limit", cfg.ram_limit),
        ("disk_limit", cfg.disk_limit),
    ];
    for (name, value) in limits {
        if let Some(value) = value {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
    }

    if let Some(interval) = cfg.interval {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(ConfigError::InvalidInterval(interval));
        }
    }

    if cfg.history_size == Some(0) {
        return Err(ConfigError::InvalidHistorySize);
    }

    for sink in cfg.sinks.iter().flatten() {
        sink.validate()?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let name = format!("{}{}", ENV_PREFIX, key);
    let raw = lookup(&name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}: cannot parse '{}'", name, raw);
            None
        }
    }
}

/// Overlays `SYSTEM_MONITOR_*` variables resolved through `lookup`.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = parse_env(&lookup, "CPU_LIMIT") {
        config.cpu_limit = Some(v);
    }
    if let Some(v) = parse_env(&lookup, "RAM_LIMIT") {
        config.ram_limit = Some(v);
    }
    if let Some(v) = parse_env(&lookup, "DISK_LIMIT") {
        config.disk_limit = Some(v);
    }
    if let Some(v) = parse_env(&lookup, "INTERVAL") {
        config.interval = Some(v);
    }
    if let Some(v) = parse_env(&lookup, "HISTORY_SIZE") {
        config.history_size = Some(v);
    }
    if let Some(v) = parse_env::<String>(&lookup, "LOG_LEVEL") {
        config.log_level = Some(v);
    }
}

/// Resolves configuration from CLI args, environment, config file, and defaults.
/// This enforces precedence: CLI (if provided) > environment > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    resolve_config_with_env(args, |key| std::env::var(key).ok())
}

pub fn resolve_config_with_env(
    args: &Args,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    apply_env_overrides(&mut config, lookup);

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if let Some(path) = &args.log_file {
        config.log_file = Some(path.clone());
    }

    // Thresholds and polling: CLI wins if provided
    if args.cpu_limit.is_some() {
        config.cpu_limit = args.cpu_limit;
    }
    if args.ram_limit.is_some() {
        config.ram_limit = args.ram_limit;
    }
    if args.disk_limit.is_some() {
        config.disk_limit = args.disk_limit;
    }
    if args.interval.is_some() {
        config.interval = args.interval;
    }
    if args.history_size.is_some() {
        config.history_size = args.history_size;
    }
    if args.top_processes.is_some() {
        config.top_processes = args.top_processes;
    }

    if args.no_http {
        config.enable_http = Some(false);
    }

    Ok(config)
}

const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/herakles/sysmon.yaml",
    "/etc/herakles/sysmon.yml",
    "/etc/herakles/sysmon.json",
    "./herakles-sysmon.yaml",
    "./herakles-sysmon.yml",
    "./herakles-sysmon.json",
];

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Err(ConfigError::Load(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = parse_config(&path, &content)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses `content` in the format implied by the extension of `path`.
pub fn parse_config(path: &Path, content: &str) -> Result<Config, ConfigError> {
    let load = |e: &dyn std::fmt::Display| ConfigError::Load(format!("{}: {}", path.display(), e));

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| load(&e)),
        Some("toml") => toml::from_str(content).map_err(|e| load(&e)),
        // Default to YAML
        _ => serde_yaml::from_str(content).map_err(|e| load(&e)),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
