//! Application state management for the HTTP surface.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use herakles_sysmon::Monitor;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::MonitorMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub registry: Registry,
    pub metrics: MonitorMetrics,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
