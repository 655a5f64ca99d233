//! Alerts command implementation.

use anyhow::Context;
use herakles_sysmon::config::Config;
use herakles_sysmon::sinks::DELIVERY_TIMEOUT;
use herakles_sysmon::Monitor;
use std::time::Duration;
use tracing::warn;

/// Evaluates every threshold against a fresh snapshot and waits for delivery.
pub async fn command_alerts(config: &Config) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(config).context("failed to set up monitor")?;
    let alerts = monitor.alerts().context("failed to evaluate thresholds")?;

    if alerts.is_empty() {
        println!("✅ No thresholds exceeded");
        return Ok(());
    }

    if !monitor
        .wait_for_deliveries(DELIVERY_TIMEOUT + Duration::from_secs(1))
        .await
    {
        warn!("Some alert deliveries did not finish in time");
    }

    println!("⚠️  {} alert(s) raised", alerts.len());
    Ok(())
}
