//! Error types for the monitor.
//!
//! Lower layers (metric sources, alert sinks) report failures through their
//! own error types and are expected to degrade; only the scheduler escalates
//! repeated failures into a state change.

use crate::cache::MetricGroup;

/// Failure of a single metric-source call.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("{0} is not available on this host")]
    Unavailable(&'static str),
}

impl SourceError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }
}

/// Failure of an alert sink delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered with status {0}")]
    Status(u16),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Invalid configuration, detected at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a percentage in [0, 100], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("history_size must be at least 1")]
    InvalidHistorySize,

    #[error("alert sink '{0}' is missing a webhook URL")]
    MissingUrl(&'static str),

    #[error("no tokio runtime available to dispatch alerts")]
    NoRuntime,

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Umbrella error for monitor operations.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("{group:?} tier refresh failed: {source}")]
    Source {
        group: MetricGroup,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("monitoring cycle panicked: {0}")]
    Panicked(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
