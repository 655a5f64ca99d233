//! Threshold evaluation and alert dispatch.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn, Instrument, Span};

use crate::assembler::StateAssembler;
use crate::error::{ConfigError, Result};
use crate::sinks::AlertSink;
use crate::snapshot::Snapshot;
use crate::source::{DiskUsage, SensorTable, TemperatureReading};
use crate::stats::MonitorStats;

pub const DEFAULT_CPU_LIMIT: f64 = 70.0;
pub const DEFAULT_RAM_LIMIT: f64 = 70.0;
pub const DEFAULT_DISK_LIMIT: f64 = 80.0;

/// Usage limits in percent. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    cpu_limit: f64,
    ram_limit: f64,
    disk_limit: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_limit: DEFAULT_CPU_LIMIT,
            ram_limit: DEFAULT_RAM_LIMIT,
            disk_limit: DEFAULT_DISK_LIMIT,
        }
    }
}

impl AlertThresholds {
    /// Rejects values outside [0, 100] (including NaN).
    pub fn new(cpu_limit: f64, ram_limit: f64, disk_limit: f64) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("cpu_limit", cpu_limit),
            ("ram_limit", ram_limit),
            ("disk_limit", disk_limit),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(Self {
            cpu_limit,
            ram_limit,
            disk_limit,
        })
    }

    pub fn cpu_limit(&self) -> f64 {
        self.cpu_limit
    }

    pub fn ram_limit(&self) -> f64 {
        self.ram_limit
    }

    pub fn disk_limit(&self) -> f64 {
        self.disk_limit
    }
}

pub fn cpu_alert(cpu: f64) -> String {
    format!("High CPU usage: {:.0}%", cpu)
}

pub fn ram_alert(ram: f64) -> String {
    format!("High RAM usage: {:.0}%", ram)
}

pub fn disk_alert(disk: &DiskUsage) -> String {
    format!("Low disk space on {}: {:.0}% used", disk.mount, disk.percent)
}

/// Critical takes precedence over high; at most one alert per reading.
pub fn temperature_alert(sensor: &str, reading: &TemperatureReading) -> Option<String> {
    if let Some(critical) = reading.critical {
        if reading.current >= critical {
            return Some(format!(
                "Critical temperature on {}/{}: {:.1}°C (critical {:.1}°C)",
                sensor, reading.label, reading.current, critical
            ));
        }
    }
    if let Some(high) = reading.high {
        if reading.current >= high {
            return Some(format!(
                "High temperature on {}/{}: {:.1}°C (high {:.1}°C)",
                sensor, reading.label, reading.current, high
            ));
        }
    }
    None
}

/// Compares metrics against thresholds and fans alerts out to the sinks.
///
/// Dispatch spawns one task per (alert, sink) pair on the runtime captured at
/// construction, so `check` can run on blocking threads and never waits for
/// delivery.
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
    assembler: Arc<StateAssembler>,
    sinks: Vec<Arc<dyn AlertSink>>,
    handle: Handle,
    span: Span,
}

impl AlertEvaluator {
    /// Must be called from within a tokio runtime.
    pub fn new(
        thresholds: AlertThresholds,
        assembler: Arc<StateAssembler>,
        sinks: Vec<Arc<dyn AlertSink>>,
        span: Span,
    ) -> Result<Self, ConfigError> {
        let handle = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self {
            thresholds,
            assembler,
            sinks,
            handle,
            span,
        })
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn assembler(&self) -> &Arc<StateAssembler> {
        &self.assembler
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    fn stats(&self) -> &MonitorStats {
        self.assembler.stats()
    }

    /// Evaluates thresholds and dispatches every resulting alert.
    ///
    /// Without a snapshot, cpu and ram come from the fast tier and disks are
    /// only looked at when `force_full_check` is set or the slow tier has no
    /// fresh entry. With a snapshot, all values including temperatures come
    /// from it.
    #[instrument(skip_all, parent = &self.span, fields(with_snapshot = snapshot.is_some(), force_full_check = force_full_check))]
    pub fn check(&self, snapshot: Option<&Snapshot>, force_full_check: bool) -> Result<Vec<String>> {
        let mut alerts = Vec::new();

        let (cpu, ram) = match snapshot {
            Some(s) => (s.cpu(), s.ram()),
            None => {
                let fast = self.assembler.get_fast()?;
                (fast.cpu, fast.ram)
            }
        };
        if cpu > self.thresholds.cpu_limit {
            alerts.push(cpu_alert(cpu));
        }
        if ram > self.thresholds.ram_limit {
            alerts.push(ram_alert(ram));
        }

        match snapshot {
            Some(s) => {
                self.push_disk_alerts(s.disks(), &mut alerts);
                self.push_temperature_alerts(s.temperatures(), &mut alerts);
            }
            None => {
                if force_full_check || self.assembler.cached_slow().is_none() {
                    let slow = self.assembler.get_slow();
                    self.push_disk_alerts(&slow.disks, &mut alerts);
                }
            }
        }

        debug!("Threshold check produced {} alert(s)", alerts.len());
        self.dispatch(&alerts);
        Ok(alerts)
    }

    /// Evaluates only the temperature readings of `snapshot`.
    pub fn check_sensors(&self, snapshot: &Snapshot) -> Vec<String> {
        let mut alerts = Vec::new();
        self.push_temperature_alerts(snapshot.temperatures(), &mut alerts);
        self.dispatch(&alerts);
        alerts
    }

    fn push_disk_alerts(&self, disks: &[DiskUsage], alerts: &mut Vec<String>) {
        alerts.extend(
            disks
                .iter()
                .filter(|d| d.percent > self.thresholds.disk_limit)
                .map(disk_alert),
        );
    }

    fn push_temperature_alerts(
        &self,
        temperatures: &SensorTable<TemperatureReading>,
        alerts: &mut Vec<String>,
    ) {
        for (sensor, readings) in temperatures {
            alerts.extend(readings.iter().filter_map(|r| temperature_alert(sensor, r)));
        }
    }

    /// Spawns one delivery task per (alert, sink) pair and returns immediately.
    pub fn dispatch(&self, alerts: &[String]) {
        if alerts.is_empty() {
            return;
        }
        self.stats().record_alerts(alerts.len());

        for alert in alerts {
            for sink in &self.sinks {
                let sink = Arc::clone(sink);
                let alert = alert.clone();
                let stats = Arc::clone(self.assembler.stats());
                self.handle.spawn(
                    async move {
                        match sink.deliver(&alert).await {
                            Ok(()) => stats.record_delivery(),
                            Err(e) => {
                                stats.record_sink_failure();
                                warn!("Failed to deliver alert via {}: {}", sink.name(), e);
                            }
                        }
                    }
                    .instrument(self.span.clone()),
                );
            }
        }
    }
}
