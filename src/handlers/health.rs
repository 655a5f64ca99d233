//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! scheduler state and internal monitor statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use herakles_sysmon::scheduler::SchedulerStatus;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "herakles-sysmon - host metrics with tiered caching and threshold alerts";

/// Formats seconds as minutes, hours or days, whichever reads best.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds as f64 / SECONDS_PER_HOUR;
    if hours < 1.0 {
        format!("{:.1} minutes", hours * MINUTES_PER_HOUR)
    } else if hours < HOURS_PER_DAY {
        format!("{:.1} hours", hours)
    } else {
        format!("{:.1} days", hours / HOURS_PER_DAY)
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let monitor = &state.monitor;
    let scheduler = monitor.status();

    // Derive HTTP status from scheduler state
    let (status, message) = match scheduler {
        SchedulerStatus::Running => (StatusCode::OK, "OK - Monitoring"),
        SchedulerStatus::Stopped => (StatusCode::OK, "OK - Scheduler stopped"),
        SchedulerStatus::Halted => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Scheduler halted after repeated failures",
        ),
    };

    let uptime_str = format_duration(state.start_time.elapsed().as_secs());
    let thresholds = monitor.thresholds();
    let last_snapshot = monitor
        .latest()
        .map(|s| s.timestamp().to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    // Render plain-text table from MonitorStats
    let table = monitor.stats().render_table(&monitor.cache_stats());

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\n\
             Uptime: {uptime_str}\n\
             Scheduler: {} ({} consecutive errors)\n\
             Interval: {:.1}s\n\
             Limits: cpu {:.0}% | ram {:.0}% | disk {:.0}%\n\
             Last snapshot: {last_snapshot}\n\n\
             {table}\n{FOOTER_TEXT}",
            scheduler.as_str(),
            monitor.consecutive_errors(),
            monitor.interval().as_secs_f64(),
            thresholds.cpu_limit(),
            thresholds.ram_limit(),
            thresholds.disk_limit(),
        ),
    )
}
