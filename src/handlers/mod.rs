//! HTTP endpoint handlers for the monitor.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Landing page listing the endpoints
//! - `/snapshot`: Fresh system snapshot (JSON)
//! - `/history`: Retained snapshots, oldest first (JSON)
//! - `/health`: Scheduler state and internal statistics (text)
//! - `/metrics`: Prometheus metrics endpoint

pub mod health;
pub mod history;
pub mod metrics;
pub mod root;
pub mod snapshot;

// Re-export handlers
pub use health::health_handler;
pub use history::history_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
pub use snapshot::snapshot_handler;
