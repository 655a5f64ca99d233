//! Read-through assembly of tier bundles and full snapshots.
//!
//! Each `get_*` call serves the tier from the cache while fresh and otherwise
//! queries the metric source, bundles the results and stores them with the
//! tier's ttl. Source I/O always happens outside the cache lock, so two
//! concurrent misses may both query the source; the later `set` wins.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::{MetricGroup, TieredCache};
use crate::error::{MonitorError, Result, SourceError};
use crate::history::History;
use crate::snapshot::{FastMetrics, GroupBundle, MediumMetrics, SlowMetrics, Snapshot};
use crate::source::MetricSource;
use crate::stats::MonitorStats;

/// Default number of processes kept in the medium tier.
pub const DEFAULT_TOP_PROCESSES: usize = 5;

pub struct StateAssembler {
    source: Arc<dyn MetricSource>,
    cache: TieredCache,
    history: History,
    top_n: usize,
    stats: Arc<MonitorStats>,
}

impl StateAssembler {
    pub fn new(
        source: Arc<dyn MetricSource>,
        history_size: usize,
        top_n: usize,
        stats: Arc<MonitorStats>,
    ) -> Self {
        Self {
            source,
            cache: TieredCache::new(),
            history: History::new(history_size),
            top_n,
            stats,
        }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> &Arc<MonitorStats> {
        &self.stats
    }

    /// Turns a failed optional metric into an omission.
    fn optional<T>(&self, what: &'static str, result: std::result::Result<T, SourceError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.stats.record_source_error();
                debug!("Omitting {}: {}", what, e);
                None
            }
        }
    }

    fn required<T>(
        &self,
        group: MetricGroup,
        result: std::result::Result<T, SourceError>,
    ) -> Result<T> {
        result.map_err(|source| {
            self.stats.record_source_error();
            warn!("Required {} metric unavailable: {}", group.as_str(), source);
            MonitorError::Source { group, source }
        })
    }

    /// Fast tier. Fails when cpu or ram cannot be read; nothing is cached then.
    pub fn get_fast(&self) -> Result<Arc<FastMetrics>> {
        if let Some(GroupBundle::Fast(fast)) = self.cache.get(&MetricGroup::Fast) {
            return Ok(fast);
        }

        let cpu = self.required(MetricGroup::Fast, self.source.cpu_percent())?;
        let ram = self.required(MetricGroup::Fast, self.source.ram_percent())?;
        let interfaces = self
            .optional("network interfaces", self.source.network_per_interface())
            .unwrap_or_default();

        let fast = Arc::new(FastMetrics {
            cpu,
            ram,
            interfaces,
        });
        self.store(GroupBundle::Fast(Arc::clone(&fast)));
        Ok(fast)
    }

    pub fn get_medium(&self) -> Arc<MediumMetrics> {
        if let Some(GroupBundle::Medium(medium)) = self.cache.get(&MetricGroup::Medium) {
            return medium;
        }

        let medium = Arc::new(MediumMetrics {
            temperatures: self
                .optional("temperatures", self.source.temperatures())
                .unwrap_or_default(),
            fans: self.optional("fans", self.source.fans()).unwrap_or_default(),
            top_processes: self
                .optional("top processes", self.source.top_processes(self.top_n))
                .unwrap_or_default(),
        });
        self.store(GroupBundle::Medium(Arc::clone(&medium)));
        medium
    }

    pub fn get_slow(&self) -> Arc<SlowMetrics> {
        if let Some(GroupBundle::Slow(slow)) = self.cache.get(&MetricGroup::Slow) {
            return slow;
        }

        let slow = Arc::new(SlowMetrics {
            disks: self
                .optional("disks", self.source.disk_table())
                .unwrap_or_default(),
            gpus: self
                .optional("gpus", self.source.gpu_list())
                .unwrap_or_default(),
            uptime: self.optional("uptime", self.source.uptime_string()),
            network: self.optional("network totals", self.source.network_totals()),
            battery: self
                .optional("battery", self.source.battery())
                .flatten(),
        });
        self.store(GroupBundle::Slow(Arc::clone(&slow)));
        slow
    }

    pub fn cached_fast(&self) -> Option<Arc<FastMetrics>> {
        match self.cache.peek(&MetricGroup::Fast) {
            Some(GroupBundle::Fast(fast)) => Some(fast),
            _ => None,
        }
    }

    pub fn cached_medium(&self) -> Option<Arc<MediumMetrics>> {
        match self.cache.peek(&MetricGroup::Medium) {
            Some(GroupBundle::Medium(medium)) => Some(medium),
            _ => None,
        }
    }

    /// Slow tier if a fresh entry exists, without refreshing it.
    pub fn cached_slow(&self) -> Option<Arc<SlowMetrics>> {
        match self.cache.peek(&MetricGroup::Slow) {
            Some(GroupBundle::Slow(slow)) => Some(slow),
            _ => None,
        }
    }

    /// Assembles all tiers into a snapshot and appends it to the history.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let started = Instant::now();

        let fast = self.get_fast()?;
        let medium = self.get_medium();
        let slow = self.get_slow();

        let snapshot = Arc::new(Snapshot::new(Utc::now(), fast, medium, slow));
        self.history.push(Arc::clone(&snapshot));

        let elapsed = started.elapsed().as_secs_f64();
        self.stats.record_snapshot(elapsed);
        debug!(
            "Snapshot assembled in {:.3}s (history: {}/{})",
            elapsed,
            self.history.len(),
            self.history.capacity()
        );
        Ok(snapshot)
    }

    fn store(&self, bundle: GroupBundle) {
        let group = bundle.group();
        self.cache.set(group, bundle, group.ttl());
        self.stats.record_tier_refresh();
        debug!("Refreshed {} tier", group.as_str());
    }
}
