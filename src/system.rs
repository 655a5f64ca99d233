//! System-wide metrics from the /proc filesystem.
//!
//! CPU utilisation is derived from two /proc/stat samples; memory usage from
//! /proc/meminfo; uptime from /proc/uptime.

use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::SourceError;

pub const STAT_PATH: &str = "/proc/stat";
pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const UPTIME_PATH: &str = "/proc/uptime";

/// Interval between the two samples of the very first CPU reading.
pub const INITIAL_CPU_SAMPLE: Duration = Duration::from_millis(100);

/// Aggregate CPU times from the `cpu` line of /proc/stat, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Non-active time: true idle plus time spent waiting for I/O.
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy percentage between `previous` and `self`.
    pub fn usage_since(&self, previous: &CpuStat) -> f64 {
        let delta_total = self.total().saturating_sub(previous.total());
        if delta_total == 0 {
            return 0.0;
        }
        let delta_idle = self.idle_total().saturating_sub(previous.idle_total());
        (delta_total.saturating_sub(delta_idle)) as f64 / delta_total as f64 * 100.0
    }
}

/// Parses the aggregate `cpu ` line of /proc/stat content.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, SourceError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SourceError::parse("/proc/stat", "no aggregate cpu line"))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>().unwrap_or(0))
        .collect();
    if values.len() < 7 {
        return Err(SourceError::parse(
            "/proc/stat",
            format!("expected at least 7 cpu fields, got {}", values.len()),
        ));
    }

    Ok(CpuStat {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values.get(7).copied().unwrap_or(0),
    })
}

pub fn read_cpu_stat() -> Result<CpuStat, SourceError> {
    let content = fs::read_to_string(STAT_PATH).map_err(|e| SourceError::io(STAT_PATH, e))?;
    parse_cpu_stat(&content)
}

/// Computes CPU utilisation as the delta to the previous reading.
///
/// The first call has no previous reading and samples twice,
/// `INITIAL_CPU_SAMPLE` apart.
#[derive(Default)]
pub struct CpuSampler {
    previous: Mutex<Option<CpuStat>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu_percent(&self) -> Result<f64, SourceError> {
        let previous = *self.previous.lock().unwrap_or_else(|e| e.into_inner());

        let baseline = match previous {
            Some(stat) => stat,
            None => {
                let first = read_cpu_stat()?;
                std::thread::sleep(INITIAL_CPU_SAMPLE);
                first
            }
        };

        let current = read_cpu_stat()?;
        *self.previous.lock().unwrap_or_else(|e| e.into_inner()) = Some(current);

        // A reading taken too soon after the previous one carries no signal;
        // resample over a short window instead of reporting 0%.
        if current.total() == baseline.total() {
            std::thread::sleep(INITIAL_CPU_SAMPLE);
            let later = read_cpu_stat()?;
            *self.previous.lock().unwrap_or_else(|e| e.into_inner()) = Some(later);
            return Ok(later.usage_since(&current));
        }

        Ok(current.usage_since(&baseline))
    }
}

/// Physical memory totals from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    /// Used memory in percent of total, as `(total - available) / total`.
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.total_bytes.saturating_sub(self.available_bytes) as f64 / self.total_bytes as f64
            * 100.0
    }
}

fn meminfo_kb(line: &str) -> Option<u64> {
    line.split_whitespace().nth(1)?.parse::<u64>().ok()
}

pub fn parse_meminfo(content: &str) -> Result<MemoryInfo, SourceError> {
    let mut total = None;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            total = meminfo_kb(line);
        } else if line.starts_with("MemAvailable:") {
            available = meminfo_kb(line);
        } else if line.starts_with("MemFree:") {
            free = meminfo_kb(line).unwrap_or(0);
        } else if line.starts_with("Buffers:") {
            buffers = meminfo_kb(line).unwrap_or(0);
        } else if line.starts_with("Cached:") {
            cached = meminfo_kb(line).unwrap_or(0);
        }
    }

    let total = total.ok_or_else(|| SourceError::parse("/proc/meminfo", "MemTotal missing"))?;
    // Kernels before 3.14 have no MemAvailable
    let available = available.unwrap_or(free + buffers + cached);

    Ok(MemoryInfo {
        total_bytes: total * 1024,
        available_bytes: available * 1024,
    })
}

pub fn read_memory_info() -> Result<MemoryInfo, SourceError> {
    let content = fs::read_to_string(MEMINFO_PATH).map_err(|e| SourceError::io(MEMINFO_PATH, e))?;
    parse_meminfo(&content)
}

/// Reads system uptime in seconds from /proc/uptime.
pub fn read_uptime() -> Result<f64, SourceError> {
    let content = fs::read_to_string(UPTIME_PATH).map_err(|e| SourceError::io(UPTIME_PATH, e))?;

    content
        .split_whitespace()
        .next()
        .ok_or_else(|| SourceError::parse("/proc/uptime", "no fields found"))?
        .parse::<f64>()
        .map_err(|e| SourceError::parse("/proc/uptime", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_stat() {
        let content = "cpu  100 5 50 800 20 3 2 10 0 0\ncpu0 50 2 25 400 10 1 1 5 0 0\nintr 12345\n";
        let stat = parse_cpu_stat(content).unwrap();
        assert_eq!(stat.user, 100);
        assert_eq!(stat.steal, 10);
        assert_eq!(stat.total(), 990);
        assert_eq!(stat.idle_total(), 820);
    }

    #[test]
    fn test_parse_cpu_stat_missing_line() {
        assert!(parse_cpu_stat("intr 1 2 3\n").is_err());
    }

    #[test]
    fn test_usage_since() {
        let before = CpuStat {
            user: 100,
            idle: 900,
            ..Default::default()
        };
        let after = CpuStat {
            user: 150,
            idle: 950,
            ..Default::default()
        };
        assert_eq!(after.usage_since(&before), 50.0);
        assert_eq!(before.usage_since(&before), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.total_bytes, 16_000_000 * 1024);
        assert_eq!(info.used_percent(), 75.0);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let content = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 50 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.used_percent(), 80.0);
    }

    #[test]
    fn test_cpu_sampler_on_host() {
        let sampler = CpuSampler::new();
        let first = sampler.cpu_percent().unwrap();
        let second = sampler.cpu_percent().unwrap();
        assert!((0.0..=100.0).contains(&first));
        assert!((0.0..=100.0).contains(&second));
    }
}
