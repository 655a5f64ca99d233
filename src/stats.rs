//! Internal statistics of the monitor.
//!
//! Counters are plain atomics so the background loop, dispatch tasks and HTTP
//! handlers can update and read them without coordination.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::cache::CacheStats;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

pub struct MonitorStats {
    pub cycles: AtomicU64,
    pub cycle_failures: AtomicU64,
    pub snapshots: AtomicU64,
    pub tier_refreshes: AtomicU64,
    pub source_errors: AtomicU64,
    pub alerts_generated: AtomicU64,
    pub alerts_delivered: AtomicU64,
    pub sink_failures: AtomicU64,
    pub cycle_duration_seconds: Stat,
    pub snapshot_duration_seconds: Stat,
    pub start_time: Instant,
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            cycle_failures: AtomicU64::new(0),
            snapshots: AtomicU64::new(0),
            tier_refreshes: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            alerts_generated: AtomicU64::new(0),
            alerts_delivered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            cycle_duration_seconds: Stat::default(),
            snapshot_duration_seconds: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl MonitorStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, duration_seconds: f64) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.cycle_duration_seconds.add_sample(duration_seconds);
    }

    pub fn record_cycle_failure(&self) {
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self, duration_seconds: f64) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
        self.snapshot_duration_seconds.add_sample(duration_seconds);
    }

    pub fn record_tier_refresh(&self) {
        self.tier_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alerts(&self, count: usize) {
        self.alerts_generated
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.alerts_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycle_success_rate(&self) -> f64 {
        let total = self.cycles.load(Ordering::Relaxed);
        let failed = self.cycle_failures.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            (total.saturating_sub(failed) as f64 / total as f64) * 100.0
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_table(&self, cache: &CacheStats) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();
        let (sd_cur, sd_avg, sd_max, sd_min, _) = self.snapshot_duration_seconds.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "SYSTEM MONITOR - INTERNAL STATS").ok();
        writeln!(out, "===============================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "POLLING LOOP").ok();
        writeln!(out, "------------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cycle_duration (s)",
            format!("{:.3}", cd_cur),
            format!("{:.3}", cd_avg),
            format!("{:.3}", cd_max),
            format!("{:.3}", cd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "snapshot_duration (s)",
            format!("{:.3}", sd_cur),
            format!("{:.3}", sd_avg),
            format!("{:.3}", sd_max),
            format!("{:.3}", sd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        let counters = [
            ("cycles_total", self.cycles.load(Ordering::Relaxed)),
            ("cycle_failures_total", self.cycle_failures.load(Ordering::Relaxed)),
            ("snapshots_total", self.snapshots.load(Ordering::Relaxed)),
            ("tier_refreshes_total", self.tier_refreshes.load(Ordering::Relaxed)),
            ("source_errors_total", self.source_errors.load(Ordering::Relaxed)),
        ];
        for (name, value) in counters {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                value,
                "N/A",
                "N/A",
                "N/A",
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cycle_success_rate (%)",
            format!("{:.1}", self.cycle_success_rate()),
            "N/A",
            "N/A",
            "N/A",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "CACHE").ok();
        writeln!(out, "-----").ok();

        for (name, value) in [
            ("cache_hits", cache.hits.to_string()),
            ("cache_misses", cache.misses.to_string()),
            ("cache_entries", cache.entries.to_string()),
            ("cache_hit_ratio (%)", format!("{:.1}", cache.hit_ratio())),
        ] {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                value,
                "N/A",
                "N/A",
                "N/A",
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "ALERTS").ok();
        writeln!(out, "------").ok();

        for (name, value) in [
            ("alerts_generated", self.alerts_generated.load(Ordering::Relaxed)),
            ("alerts_delivered", self.alerts_delivered.load(Ordering::Relaxed)),
            ("sink_failures", self.sink_failures.load(Ordering::Relaxed)),
        ] {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                value,
                "N/A",
                "N/A",
                "N/A",
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "uptime: {}s", self.uptime_seconds()).ok();

        out
    }
}
