//! Snapshot command implementation.

use anyhow::Context;
use herakles_sysmon::cli::SnapshotFormat;
use herakles_sysmon::config::Config;
use herakles_sysmon::Monitor;

/// Takes one snapshot and prints it to stdout.
pub fn command_snapshot(config: &Config, format: SnapshotFormat, pretty: bool) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(config).context("failed to set up monitor")?;
    let snapshot = monitor.state().context("failed to take snapshot")?;

    match format {
        SnapshotFormat::Text => print!("{}", snapshot),
        SnapshotFormat::Json => println!("{}", snapshot.to_json(pretty)?),
    }
    Ok(())
}
