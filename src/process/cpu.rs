//! Per-process CPU usage.
//!
//! CPU time is read from `/proc/<pid>/stat` and turned into a percentage by
//! comparing against the previous observation of the same pid. A pid seen for
//! the first time reports 0%.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use std::sync::RwLock as StdRwLock;
use std::time::Instant;
use tracing::debug;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Last observed CPU time of one process.
#[derive(Clone, Copy)]
pub struct CpuEntry {
    pub cpu_time_seconds: f64,
    pub last_updated: Instant,
}

/// Parse total CPU time (user+system) in seconds from /proc/<pid>/stat.
///
/// The command name may contain spaces and parentheses, so fields are counted
/// from the last `)`.
pub fn parse_cpu_time_seconds(proc_path: &Path) -> Result<f64, std::io::Error> {
    let content = fs::read_to_string(proc_path.join("stat"))?;

    let after_comm = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| std::io::Error::other("Invalid stat format"))?;

    // After the comm field: state(0) ppid(1) ... utime(11) stime(12)
    let parts: Vec<&str> = after_comm.split_whitespace().collect();
    if parts.len() <= 12 {
        return Err(std::io::Error::other("Invalid stat format"));
    }

    let utime: f64 = parts[11].parse().unwrap_or(0.0);
    let stime: f64 = parts[12].parse().unwrap_or(0.0);

    Ok((utime + stime) / *CLK_TCK)
}

/// Delta-based CPU percentage per pid.
#[derive(Default)]
pub struct CpuTracker {
    cache: StdRwLock<HashMap<u32, CpuEntry>>,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// CPU usage of `pid` since its previous observation, in percent of one core.
    pub fn cpu_percent(&self, pid: u32, proc_path: &Path) -> f64 {
        let now = Instant::now();
        let cpu_time_seconds = match parse_cpu_time_seconds(proc_path) {
            Ok(v) => v,
            Err(e) => {
                debug!("Failed to read CPU time for pid {}: {}", pid, e);
                return 0.0;
            }
        };

        let previous = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&pid)
            .copied();

        let mut cpu_percent = 0.0;
        if let Some(entry) = previous {
            let dt = now.duration_since(entry.last_updated).as_secs_f64();
            let delta_cpu = cpu_time_seconds - entry.cpu_time_seconds;
            if dt > 0.0 && delta_cpu > 0.0 {
                cpu_percent = (delta_cpu / dt) * 100.0;
            }
        }

        self.cache.write().unwrap_or_else(|e| e.into_inner()).insert(
            pid,
            CpuEntry {
                cpu_time_seconds,
                last_updated: now,
            },
        );

        cpu_percent
    }

    /// Drops entries of pids not in `alive`.
    pub fn retain(&self, alive: &[u32]) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.retain(|pid, _| alive.contains(pid));
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT: &str = "1234 (test process) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 1234";

    #[test]
    fn test_parse_cpu_time_seconds() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT).expect("Failed to write stat file");

        let actual = parse_cpu_time_seconds(dir.path()).unwrap();
        let expected = 1500.0 / *CLK_TCK;
        assert!((actual - expected).abs() < 0.001);
    }

    #[test]
    fn test_parse_cpu_time_seconds_comm_with_parens() {
        let dir = tempdir().unwrap();
        let stat = "77 (weird) name) R 1 77 77 0 -1 0 0 0 0 0 200 100 0 0 20 0 1 0 5 0 0";
        std::fs::write(dir.path().join("stat"), stat).unwrap();

        let actual = parse_cpu_time_seconds(dir.path()).unwrap();
        assert!((actual - 300.0 / *CLK_TCK).abs() < 0.001);
    }

    #[test]
    fn test_parse_cpu_time_seconds_invalid_stat() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), "1234 (test) S 1 2 3").unwrap();
        assert!(parse_cpu_time_seconds(dir.path()).is_err());
    }

    #[test]
    fn test_parse_cpu_time_seconds_missing_file() {
        let dir = tempdir().unwrap();
        assert!(parse_cpu_time_seconds(dir.path()).is_err());
    }

    #[test]
    fn test_tracker_first_observation_is_zero() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), STAT).unwrap();

        let tracker = CpuTracker::new();
        assert_eq!(tracker.cpu_percent(1234, dir.path()), 0.0);
        assert_eq!(tracker.len(), 1);

        tracker.retain(&[]);
        assert!(tracker.is_empty());
    }
}
