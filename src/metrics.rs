//! Prometheus metrics definitions for herakles-sysmon.
//!
//! Gauges mirror the latest cached values of the monitor. Nothing here
//! triggers a metric refresh: values come from fresh cache tiers when
//! available, otherwise from the most recent snapshot in the history.

use herakles_sysmon::Monitor;
use prometheus::{Gauge, GaugeVec, Opts, Registry};
use std::sync::atomic::Ordering;

/// Collection of Prometheus gauges exported on `/metrics`.
#[derive(Clone)]
pub struct MonitorMetrics {
    // ========== Host Metrics ==========
    pub cpu_usage_percent: Gauge,
    pub memory_used_percent: Gauge,
    pub disk_used_percent: GaugeVec,   // labels: mountpoint
    pub temperature_celsius: GaugeVec, // labels: sensor, label
    pub fan_speed_rpm: GaugeVec,       // labels: sensor, label

    // ========== Monitor Metrics ==========
    pub scheduler_status: Gauge,
    pub consecutive_errors: Gauge,
    pub cache_hits: Gauge,
    pub cache_misses: Gauge,
    pub cache_entries: Gauge,
    pub cycles: Gauge,
    pub cycle_failures: Gauge,
    pub alerts_generated: Gauge,
    pub sink_failures: Gauge,
    pub history_len: Gauge,
}

impl MonitorMetrics {
    /// Creates and registers all gauges with the registry.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        // ========== Host Metrics ==========
        let cpu_usage_percent = Gauge::new(
            "herakles_sysmon_cpu_usage_percent",
            "System-wide CPU usage in percent",
        )?;
        let memory_used_percent = Gauge::new(
            "herakles_sysmon_memory_used_percent",
            "Used physical memory in percent",
        )?;
        let disk_used_percent = GaugeVec::new(
            Opts::new(
                "herakles_sysmon_disk_used_percent",
                "Filesystem usage in percent",
            ),
            &["mountpoint"],
        )?;
        let temperature_celsius = GaugeVec::new(
            Opts::new(
                "herakles_sysmon_temperature_celsius",
                "Current temperature sensor reading",
            ),
            &["sensor", "label"],
        )?;
        let fan_speed_rpm = GaugeVec::new(
            Opts::new("herakles_sysmon_fan_speed_rpm", "Current fan speed"),
            &["sensor", "label"],
        )?;

        // ========== Monitor Metrics ==========
        let scheduler_status = Gauge::new(
            "herakles_sysmon_scheduler_status",
            "Background scheduler status (0 = stopped, 1 = running, 2 = halted)",
        )?;
        let consecutive_errors = Gauge::new(
            "herakles_sysmon_scheduler_consecutive_errors",
            "Consecutive failed monitoring cycles",
        )?;
        let cache_hits = Gauge::new(
            "herakles_sysmon_cache_hits_total",
            "Tier lookups answered from the cache",
        )?;
        let cache_misses = Gauge::new(
            "herakles_sysmon_cache_misses_total",
            "Tier lookups that had to query the host",
        )?;
        let cache_entries = Gauge::new(
            "herakles_sysmon_cache_entries",
            "Tiers currently held in the cache",
        )?;
        let cycles = Gauge::new(
            "herakles_sysmon_cycles_total",
            "Monitoring cycles run by the scheduler",
        )?;
        let cycle_failures = Gauge::new(
            "herakles_sysmon_cycle_failures_total",
            "Monitoring cycles that failed",
        )?;
        let alerts_generated = Gauge::new(
            "herakles_sysmon_alerts_generated_total",
            "Alerts produced by threshold checks",
        )?;
        let sink_failures = Gauge::new(
            "herakles_sysmon_sink_failures_total",
            "Alert deliveries that failed",
        )?;
        let history_len = Gauge::new(
            "herakles_sysmon_history_snapshots",
            "Snapshots currently retained in the history",
        )?;

        registry.register(Box::new(cpu_usage_percent.clone()))?;
        registry.register(Box::new(memory_used_percent.clone()))?;
        registry.register(Box::new(disk_used_percent.clone()))?;
        registry.register(Box::new(temperature_celsius.clone()))?;
        registry.register(Box::new(fan_speed_rpm.clone()))?;
        registry.register(Box::new(scheduler_status.clone()))?;
        registry.register(Box::new(consecutive_errors.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycle_failures.clone()))?;
        registry.register(Box::new(alerts_generated.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(history_len.clone()))?;

        Ok(Self {
            cpu_usage_percent,
            memory_used_percent,
            disk_used_percent,
            temperature_celsius,
            fan_speed_rpm,
            scheduler_status,
            consecutive_errors,
            cache_hits,
            cache_misses,
            cache_entries,
            cycles,
            cycle_failures,
            alerts_generated,
            sink_failures,
            history_len,
        })
    }

    /// Copies the monitor's current cached state into the gauges.
    pub fn update(&self, monitor: &Monitor) {
        let assembler = monitor.assembler();
        let latest = monitor.latest();

        let snapshot = latest.as_deref();

        let cached_fast = assembler.cached_fast();
        if let Some(fast) = cached_fast.as_deref().or(snapshot.map(|s| s.fast())) {
            self.cpu_usage_percent.set(fast.cpu);
            self.memory_used_percent.set(fast.ram);
        }

        let cached_slow = assembler.cached_slow();
        if let Some(slow) = cached_slow.as_deref().or(snapshot.map(|s| s.slow())) {
            self.disk_used_percent.reset();
            for disk in &slow.disks {
                self.disk_used_percent
                    .with_label_values(&[disk.mount.as_str()])
                    .set(disk.percent);
            }
        }

        let cached_medium = assembler.cached_medium();
        if let Some(medium) = cached_medium.as_deref().or(snapshot.map(|s| s.medium())) {
            self.temperature_celsius.reset();
            for (sensor, readings) in &medium.temperatures {
                for reading in readings {
                    self.temperature_celsius
                        .with_label_values(&[sensor.as_str(), reading.label.as_str()])
                        .set(reading.current);
                }
            }
            self.fan_speed_rpm.reset();
            for (sensor, readings) in &medium.fans {
                for reading in readings {
                    self.fan_speed_rpm
                        .with_label_values(&[sensor.as_str(), reading.label.as_str()])
                        .set(reading.current);
                }
            }
        }

        self.scheduler_status.set(monitor.status() as u8 as f64);
        self.consecutive_errors
            .set(monitor.consecutive_errors() as f64);

        let cache = monitor.cache_stats();
        self.cache_hits.set(cache.hits as f64);
        self.cache_misses.set(cache.misses as f64);
        self.cache_entries.set(cache.entries as f64);

        let stats = monitor.stats();
        self.cycles
            .set(stats.cycles.load(Ordering::Relaxed) as f64);
        self.cycle_failures
            .set(stats.cycle_failures.load(Ordering::Relaxed) as f64);
        self.alerts_generated
            .set(stats.alerts_generated.load(Ordering::Relaxed) as f64);
        self.sink_failures
            .set(stats.sink_failures.load(Ordering::Relaxed) as f64);
        self.history_len.set(assembler.history().len() as f64);
    }
}
