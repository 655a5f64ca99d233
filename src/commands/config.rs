//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use herakles_sysmon::cli::ConfigFormat;
use herakles_sysmon::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-sysmon.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r##"# Herakles System Monitor Configuration
# =====================================
#
# Alert Thresholds (percent, 0-100)
# ---------------------------------
# cpu_limit: 70.0              # Alert when CPU usage exceeds this
# ram_limit: 70.0              # Alert when RAM usage exceeds this
# disk_limit: 80.0             # Alert when any filesystem exceeds this
#
# Polling
# -------
# interval: 60.0               # Seconds between full snapshots
# history_size: 100            # Snapshots kept in memory
# top_processes: 5             # Processes listed per snapshot
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
# log_file: null               # Log file path (null = stderr)
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9215                   # HTTP port
# enable_http: true            # Serve /snapshot, /history, /health, /metrics
#
# Alert Sinks
# -----------
# sinks:
#   - type: print              # One line per alert on stdout
#   - type: log                # warn! event, ASCII only
#   - type: webhook
#     url: "https://hooks.example.com/alerts"
#   - type: slack
#     webhook_url: "https://hooks.slack.com/services/..."
#     username: "SystemMonitor"
#     channel: "#ops"
#   - type: discord
#     webhook_url: "https://discord.com/api/webhooks/..."
#
# Environment overrides: SYSTEM_MONITOR_CPU_LIMIT, SYSTEM_MONITOR_RAM_LIMIT,
# SYSTEM_MONITOR_DISK_LIMIT, SYSTEM_MONITOR_INTERVAL,
# SYSTEM_MONITOR_HISTORY_SIZE, SYSTEM_MONITOR_LOG_LEVEL
"##;

    format!("{comments}\n{yaml}")
}
