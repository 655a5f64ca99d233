//! Herakles System Monitor Library
//!
//! Periodically samples host metrics and raises alerts when configured
//! thresholds are exceeded. Metrics are grouped into three tiers with their
//! own lifetimes, so cheap checks can run often without re-reading expensive
//! sources.
//!
//! # Features
//!
//! - **Tiered Cache**: fast (1s), medium (30s) and slow (300s) metric groups
//! - **Snapshots**: immutable composites of all tiers, kept in a bounded history
//! - **Threshold Alerts**: CPU, RAM, disk and temperature checks delivered to pluggable sinks
//! - **Resilient Scheduler**: single background loop with backoff and a circuit breaker
//!
//! # Usage
//!
//! ```no_run
//! use herakles_sysmon::{AlertThresholds, Monitor};
//!
//! # async fn run() -> herakles_sysmon::error::Result<()> {
//! let monitor = Monitor::builder()
//!     .thresholds(AlertThresholds::new(80.0, 75.0, 90.0)?)
//!     .interval_secs(30.0)
//!     .build()?;
//!
//! // One-off snapshot
//! let snapshot = monitor.state()?;
//! println!("{}", snapshot);
//!
//! // Background monitoring until Ctrl+C
//! monitor
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod assembler;
pub mod cache;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod error;
pub mod history;
pub mod monitor;
pub mod process;
pub mod procfs;
pub mod ringbuffer;
pub mod scheduler;
pub mod sinks;
pub mod snapshot;
pub mod source;
pub mod stats;
pub mod system;

// Re-export main types for convenience
pub use alerts::{AlertEvaluator, AlertThresholds};
pub use assembler::StateAssembler;
pub use cache::{CacheStats, MetricGroup, TieredCache};
pub use config::Config;
pub use error::{ConfigError, MonitorError, SinkError, SourceError};
pub use history::History;
pub use monitor::{Monitor, MonitorBuilder};
pub use procfs::ProcfsSource;
pub use scheduler::{Scheduler, SchedulerStatus};
pub use sinks::{AlertSink, SinkConfig};
pub use snapshot::{Snapshot, SnapshotRecord};
pub use source::MetricSource;
pub use stats::MonitorStats;
