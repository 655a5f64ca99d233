//! Landing page listing the endpoints and the monitor's current state.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use std::fmt::Write;
use tracing::{debug, instrument};

use crate::handlers::health::{format_duration, FOOTER_TEXT};
use crate::state::SharedState;

/// Path and description of every served endpoint.
pub const ENDPOINTS: [(&str, &str); 4] = [
    ("/snapshot", "fresh snapshot as JSON (?pretty=true)"),
    ("/history", "retained snapshots, oldest first (?limit=N)"),
    ("/health", "scheduler state and internal statistics"),
    ("/metrics", "Prometheus metrics from cached values"),
];

/// Values shown on the landing page.
pub struct LandingInfo<'a> {
    pub uptime: String,
    pub status: &'a str,
    pub snapshots: usize,
    pub last_snapshot: Option<String>,
}

pub fn render_landing(info: &LandingInfo<'_>) -> String {
    let mut endpoints = String::new();
    for (path, description) in ENDPOINTS {
        let _ = writeln!(
            endpoints,
            "<li><a href=\"{path}\">{path}</a> - {description}</li>"
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>herakles-sysmon</title></head>\n<body>\n\
         <h1>herakles-sysmon {version}</h1>\n\
         <p>Scheduler: <b>{status}</b> | Snapshots: {snapshots} | Last snapshot: {last} | Uptime: {uptime}</p>\n\
         <ul>\n{endpoints}</ul>\n\
         <p><small>{FOOTER_TEXT}</small></p>\n</body>\n</html>\n",
        version = env!("CARGO_PKG_VERSION"),
        status = info.status,
        snapshots = info.snapshots,
        last = info.last_snapshot.as_deref().unwrap_or("never"),
        uptime = info.uptime,
    )
}

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let monitor = &state.monitor;
    let info = LandingInfo {
        uptime: format_duration(state.start_time.elapsed().as_secs()),
        status: monitor.status().as_str(),
        snapshots: monitor.assembler().history().len(),
        last_snapshot: monitor.latest().map(|s| s.timestamp().to_rfc3339()),
    };
    Html(render_landing(&info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_lists_endpoints_and_state() {
        let html = render_landing(&LandingInfo {
            uptime: "1.5 minutes".to_string(),
            status: "halted",
            snapshots: 3,
            last_snapshot: None,
        });

        for (path, _) in ENDPOINTS {
            assert!(html.contains(&format!("<a href=\"{path}\">")));
        }
        assert!(html.contains("Scheduler: <b>halted</b>"));
        assert!(html.contains("Snapshots: 3"));
        assert!(html.contains("Last snapshot: never"));
    }
}
