//! The `Monitor` facade wiring source, cache, evaluator and scheduler.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Span};

use crate::alerts::{AlertEvaluator, AlertThresholds};
use crate::assembler::{StateAssembler, DEFAULT_TOP_PROCESSES};
use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::procfs::ProcfsSource;
use crate::scheduler::{Scheduler, SchedulerStatus};
use crate::sinks::{build_sinks, AlertSink, PrintSink};
use crate::snapshot::Snapshot;
use crate::source::MetricSource;
use crate::stats::MonitorStats;

/// Default snapshot interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 60.0;

const DELIVERY_POLL: Duration = Duration::from_millis(10);

pub struct MonitorBuilder {
    source: Option<Arc<dyn MetricSource>>,
    thresholds: AlertThresholds,
    interval_secs: f64,
    history_size: usize,
    top_processes: usize,
    sinks: Vec<Arc<dyn AlertSink>>,
    span: Option<Span>,
    stop_timeout: Option<Duration>,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self {
            source: None,
            thresholds: AlertThresholds::default(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            history_size: DEFAULT_HISTORY_SIZE,
            top_processes: DEFAULT_TOP_PROCESSES,
            sinks: Vec::new(),
            span: None,
            stop_timeout: None,
        }
    }
}

impl MonitorBuilder {
    /// Defaults to the `/proc` based source.
    pub fn source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn interval_secs(mut self, interval: f64) -> Self {
        self.interval_secs = interval;
        self
    }

    pub fn history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    pub fn top_processes(mut self, n: usize) -> Self {
        self.top_processes = n;
        self
    }

    /// Adds a sink. Without any, alerts are printed to stdout.
    pub fn sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sinks(mut self, sinks: impl IntoIterator<Item = Arc<dyn AlertSink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Span that the polling loop and alert deliveries are recorded under.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = Some(timeout);
        self
    }

    /// Validates settings and wires the components. Needs a tokio runtime.
    pub fn build(self) -> Result<Monitor> {
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(ConfigError::InvalidInterval(self.interval_secs).into());
        }
        if self.history_size == 0 {
            return Err(ConfigError::InvalidHistorySize.into());
        }

        let span = self
            .span
            .unwrap_or_else(|| info_span!("monitor"));
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(ProcfsSource::new()));
        let sinks = if self.sinks.is_empty() {
            vec![Arc::new(PrintSink) as Arc<dyn AlertSink>]
        } else {
            self.sinks
        };

        let stats = Arc::new(MonitorStats::new());
        let assembler = Arc::new(StateAssembler::new(
            source,
            self.history_size,
            self.top_processes,
            Arc::clone(&stats),
        ));
        let evaluator = Arc::new(AlertEvaluator::new(
            self.thresholds,
            Arc::clone(&assembler),
            sinks,
            span.clone(),
        )?);

        let interval = Duration::from_secs_f64(self.interval_secs);
        let mut scheduler = Scheduler::new(Arc::clone(&evaluator), interval, span.clone());
        if let Some(timeout) = self.stop_timeout {
            scheduler = scheduler.with_stop_timeout(timeout);
        }

        Ok(Monitor {
            assembler,
            evaluator,
            scheduler,
            stats,
            span,
        })
    }
}

/// Host monitor: snapshot mode (`state`, `alerts`) and background mode
/// (`start`, `stop`, `run_until`).
pub struct Monitor {
    assembler: Arc<StateAssembler>,
    evaluator: Arc<AlertEvaluator>,
    scheduler: Scheduler,
    stats: Arc<MonitorStats>,
    span: Span,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    /// Builds a monitor on the `/proc` source from an effective configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder_from_config(config)?.build()
    }

    /// Builder preloaded with thresholds, polling settings and sinks of `config`.
    pub fn builder_from_config(config: &Config) -> Result<MonitorBuilder> {
        let thresholds = AlertThresholds::new(
            config.cpu_limit.unwrap_or(crate::alerts::DEFAULT_CPU_LIMIT),
            config.ram_limit.unwrap_or(crate::alerts::DEFAULT_RAM_LIMIT),
            config.disk_limit.unwrap_or(crate::alerts::DEFAULT_DISK_LIMIT),
        )?;
        let sinks = build_sinks(&config.effective_sinks())?;

        Ok(Monitor::builder()
            .thresholds(thresholds)
            .interval_secs(config.interval.unwrap_or(DEFAULT_INTERVAL_SECS))
            .history_size(config.history_size.unwrap_or(DEFAULT_HISTORY_SIZE))
            .top_processes(config.top_processes.unwrap_or(DEFAULT_TOP_PROCESSES))
            .sinks(sinks))
    }

    /// Full snapshot, refreshing stale tiers and appending to the history.
    pub fn state(&self) -> Result<Arc<Snapshot>> {
        let _enter = self.span.enter();
        self.assembler.snapshot()
    }

    /// Takes a snapshot and evaluates every threshold against it.
    pub fn alerts(&self) -> Result<Vec<String>> {
        let snapshot = self.state()?;
        self.evaluator.check(Some(&snapshot), true)
    }

    /// Threshold check on `snapshot`, or on cached tiers when `None`.
    pub fn check(&self, snapshot: Option<&Snapshot>, force_full_check: bool) -> Result<Vec<String>> {
        self.evaluator.check(snapshot, force_full_check)
    }

    pub async fn start(&self) {
        self.scheduler.start().await;
    }

    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub fn status(&self) -> SchedulerStatus {
        self.scheduler.status()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.scheduler.consecutive_errors()
    }

    /// Runs background monitoring until `shutdown` resolves, then stops.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        self.start().await;
        shutdown.await;
        info!("Shutdown requested");
        self.stop().await;
    }

    /// Waits until every dispatched delivery has finished or `timeout` elapses.
    /// Returns whether all deliveries completed.
    pub async fn wait_for_deliveries(&self, timeout: Duration) -> bool {
        let sinks = self.evaluator.sink_count() as u64;
        let finished = || {
            let expected = self.stats.alerts_generated.load(Ordering::Relaxed) * sinks;
            let done = self.stats.alerts_delivered.load(Ordering::Relaxed)
                + self.stats.sink_failures.load(Ordering::Relaxed);
            done >= expected
        };

        tokio::time::timeout(timeout, async {
            while !finished() {
                tokio::time::sleep(DELIVERY_POLL).await;
            }
        })
        .await
        .is_ok()
    }

    /// Past snapshots, oldest first.
    pub fn history(&self) -> Vec<Arc<Snapshot>> {
        self.assembler.history().to_vec()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.assembler.history().latest()
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        self.evaluator.thresholds()
    }

    pub fn interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.assembler.cache().stats()
    }

    pub fn assembler(&self) -> &Arc<StateAssembler> {
        &self.assembler
    }
}
