//! Tiered metrics cache.
//!
//! Metrics are grouped by volatility into three tiers, each with a fixed
//! time-to-live. The `TieredCache` stores one entry per tier key and serves it
//! while fresh; expired entries read as absent and are removed by
//! `clear_expired`.

use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// TTL of the fast tier (cpu, ram, per-interface counters).
pub const FAST_TTL: Duration = Duration::from_secs(1);
/// TTL of the medium tier (temperatures, fans, top processes).
pub const MEDIUM_TTL: Duration = Duration::from_secs(30);
/// TTL of the slow tier (disks, gpus, uptime, network totals, battery).
pub const SLOW_TTL: Duration = Duration::from_secs(300);

/// Refresh tier a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Fast,
    Medium,
    Slow,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 3] = [MetricGroup::Fast, MetricGroup::Medium, MetricGroup::Slow];

    /// Fixed time-to-live of this tier.
    pub fn ttl(self) -> Duration {
        match self {
            MetricGroup::Fast => FAST_TTL,
            MetricGroup::Medium => MEDIUM_TTL,
            MetricGroup::Slow => SLOW_TTL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Fast => "fast",
            MetricGroup::Medium => "medium",
            MetricGroup::Slow => "slow",
        }
    }
}

/// A cached value with its capture time and time-to-live.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub captured_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.captured_at) > self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Hit/miss counters of a cache.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            100.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Thread-safe TTL cache.
///
/// All operations take the single map lock for the duration of a lookup or
/// insert only; nothing performs I/O while holding it.
pub struct TieredCache<K = MetricGroup, V = crate::snapshot::GroupBundle> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Default for TieredCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TieredCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // The map only holds plain data, so a panic elsewhere cannot leave it
    // half-updated; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the value for `key` if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let value = {
            let entries = self.lock();
            entries
                .get(key)
                .filter(|entry| !entry.is_expired_at(now))
                .map(|entry| entry.value.clone())
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Like `get` but does not touch the hit/miss counters.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.lock()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }

    /// Whether a fresh entry exists for `key`.
    pub fn contains_fresh(&self, key: &K) -> bool {
        let now = Instant::now();
        self.lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            captured_at: Instant::now(),
            ttl,
        };
        self.lock().insert(key, entry);
    }

    /// Removes every entry whose age exceeds its ttl. Returns the number removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
