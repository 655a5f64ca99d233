//! Configuration loading and precedence.

use clap::Parser;
use herakles_sysmon::cli::Args;
use herakles_sysmon::config::{load_config, resolve_config_with_env, validate_effective_config};
use herakles_sysmon::error::ConfigError;
use herakles_sysmon::SinkConfig;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_load_yaml_with_sinks() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "sysmon.yaml",
        r#"
cpu_limit: 85
ram-limit: 90
interval: 15
sinks:
  - type: log
  - type: webhook
    url: http://localhost:9000/hook
"#,
    );

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.cpu_limit, Some(85.0));
    assert_eq!(config.ram_limit, Some(90.0));
    assert_eq!(config.interval, Some(15.0));
    assert_eq!(config.disk_limit, None);
    assert_eq!(
        config.effective_sinks(),
        vec![
            SinkConfig::Log,
            SinkConfig::Webhook {
                url: "http://localhost:9000/hook".to_string()
            }
        ]
    );
}

#[test]
fn test_load_json_and_toml() {
    let dir = TempDir::new().unwrap();
    let json = write(&dir, "sysmon.json", r#"{"disk_limit": 95.5, "port": 9300}"#);
    let toml = write(
        &dir,
        "sysmon.toml",
        "history_size = 7\n\n[[sinks]]\ntype = \"print\"\n",
    );

    let config = load_config(Some(&json)).unwrap();
    assert_eq!(config.disk_limit, Some(95.5));
    assert_eq!(config.port, Some(9300));

    let config = load_config(Some(&toml)).unwrap();
    assert_eq!(config.history_size, Some(7));
    assert_eq!(config.sinks, Some(vec![SinkConfig::Print]));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_config(Some(&dir.path().join("absent.yaml")));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.json", "{ cpu_limit: ");
    assert!(matches!(load_config(Some(&path)), Err(ConfigError::Load(_))));
}

#[test]
fn test_precedence_cli_over_env_over_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "sysmon.yaml",
        "cpu_limit: 50\nram_limit: 51\ndisk_limit: 52\ninterval: 30\n",
    );
    let path_str = path.to_str().unwrap();

    let args = Args::parse_from(["herakles-sysmon", "--config", path_str, "--cpu-limit", "90"]);
    let lookup = env(&[
        ("SYSTEM_MONITOR_CPU_LIMIT", "80"),
        ("SYSTEM_MONITOR_RAM_LIMIT", "81"),
    ]);
    let config = resolve_config_with_env(&args, lookup).unwrap();

    assert_eq!(config.cpu_limit, Some(90.0));
    assert_eq!(config.ram_limit, Some(81.0));
    assert_eq!(config.disk_limit, Some(52.0));
    assert_eq!(config.interval, Some(30.0));
}

#[test]
fn test_no_config_uses_defaults_plus_env() {
    let args = Args::parse_from(["herakles-sysmon", "--no-config"]);
    let lookup = env(&[
        ("SYSTEM_MONITOR_INTERVAL", "2.5"),
        ("SYSTEM_MONITOR_HISTORY_SIZE", "not-a-number"),
    ]);
    let config = resolve_config_with_env(&args, lookup).unwrap();

    assert_eq!(config.interval, Some(2.5));
    assert_eq!(config.history_size, Some(100));
    assert_eq!(config.cpu_limit, Some(70.0));
    assert_eq!(config.disk_limit, Some(80.0));
}

#[test]
fn test_invalid_values_fail_validation() {
    let args = Args::parse_from(["herakles-sysmon", "--no-config", "--cpu-limit", "150"]);
    let config = resolve_config_with_env(&args, env(&[])).unwrap();
    assert!(matches!(
        validate_effective_config(&config),
        Err(ConfigError::InvalidThreshold {
            name: "cpu_limit",
            ..
        })
    ));

    let args = Args::parse_from(["herakles-sysmon", "--no-config"]);
    let config = resolve_config_with_env(&args, env(&[("SYSTEM_MONITOR_INTERVAL", "0")])).unwrap();
    assert!(matches!(
        validate_effective_config(&config),
        Err(ConfigError::InvalidInterval(_))
    ));
}
