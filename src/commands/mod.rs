//! CLI command implementations for herakles-sysmon.
//!
//! This module provides implementations for the one-shot subcommands:
//! - `snapshot`: Take and print one snapshot
//! - `alerts`: Evaluate all thresholds once and deliver the alerts
//! - `config`: Configuration file generation

pub mod alerts;
pub mod config;
pub mod snapshot;

// Re-export command functions
pub use alerts::command_alerts;
pub use config::command_config;
pub use snapshot::command_snapshot;
