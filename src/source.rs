//! Metric source collaborator interface.
//!
//! A `MetricSource` answers one question per metric family. Every call may
//! fail on its own; implementations omit unavailable entries rather than
//! failing a whole table, and callers never let one failed call abort its
//! siblings.

use serde::Serialize;

use crate::error::SourceError;

/// Usage of one mounted filesystem, in bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub mount: String,
    pub percent: f64,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Cumulative network traffic since boot, all interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Counters of a single network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InterfaceCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryStatus {
    pub percent: f64,
    pub plugged: bool,
}

/// One temperature sensor input, in degrees Celsius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub label: String,
    pub current: f64,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

/// One fan input, in RPM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanReading {
    pub label: String,
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu: f64,
    pub memory: f64,
}

/// Readings grouped per sensor chip, in enumeration order.
pub type SensorTable<T> = Vec<(String, Vec<T>)>;

/// Per-interface counters, in enumeration order.
pub type InterfaceTable = Vec<(String, InterfaceCounters)>;

/// Provider of raw host metrics.
///
/// Implementations must be cheap to call repeatedly and safe to share across
/// threads; the cache decides how often each call actually happens.
pub trait MetricSource: Send + Sync {
    /// System-wide CPU utilisation in percent.
    fn cpu_percent(&self) -> Result<f64, SourceError>;

    /// Used physical memory in percent.
    fn ram_percent(&self) -> Result<f64, SourceError>;

    /// Usage of real (non-pseudo) filesystems, in partition enumeration order.
    fn disk_table(&self) -> Result<Vec<DiskUsage>, SourceError>;

    fn gpu_list(&self) -> Result<Vec<String>, SourceError>;

    /// Human readable time since boot, e.g. `3d 4h 12m`.
    fn uptime_string(&self) -> Result<String, SourceError>;

    fn network_totals(&self) -> Result<NetworkTotals, SourceError>;

    fn network_per_interface(&self) -> Result<InterfaceTable, SourceError>;

    /// `Ok(None)` when the host has no battery.
    fn battery(&self) -> Result<Option<BatteryStatus>, SourceError>;

    fn temperatures(&self) -> Result<SensorTable<TemperatureReading>, SourceError>;

    fn fans(&self) -> Result<SensorTable<FanReading>, SourceError>;

    /// The `n` busiest processes, ordered by cpu then memory, descending.
    fn top_processes(&self, n: usize) -> Result<Vec<ProcessInfo>, SourceError>;
}

/// Formats a number of seconds since boot as `Xd Yh Zm`.
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}
