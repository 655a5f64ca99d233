//! Process table scanning for the busiest processes.
//!
//! - `scanner`: process discovery and per-process reads
//! - `cpu`: delta-based CPU percentage per pid

pub mod cpu;
pub mod scanner;

pub use cpu::{parse_cpu_time_seconds, CpuTracker, CLK_TCK};
pub use scanner::{collect_proc_entries, read_process_name, read_rss_bytes, ProcEntry};

use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::source::ProcessInfo;

pub const PROC_ROOT: &str = "/proc";

/// Scans /proc in parallel and ranks processes by CPU, then memory.
pub struct ProcessScanner {
    root: PathBuf,
    tracker: CpuTracker,
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

impl ProcessScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tracker: CpuTracker::new(),
        }
    }

    /// The `n` busiest processes. `total_memory` converts RSS to percent.
    pub fn top_processes(&self, n: usize, total_memory: u64) -> Vec<ProcessInfo> {
        let entries = collect_proc_entries(&self.root);

        let mut processes: Vec<ProcessInfo> = entries
            .par_iter()
            .filter_map(|entry| {
                // Processes that exit mid-scan are skipped.
                let name = read_process_name(&entry.proc_path)
                    .unwrap_or_else(|| "Unknown".to_string());
                let rss = read_rss_bytes(&entry.proc_path)?;
                let memory = if total_memory > 0 {
                    rss as f64 / total_memory as f64 * 100.0
                } else {
                    0.0
                };
                Some(ProcessInfo {
                    pid: entry.pid,
                    name,
                    cpu: self.tracker.cpu_percent(entry.pid, &entry.proc_path),
                    memory,
                })
            })
            .collect();

        let alive: Vec<u32> = entries.iter().map(|e| e.pid).collect();
        self.tracker.retain(&alive);

        rank_processes(&mut processes);
        processes.truncate(n);
        processes
    }
}

/// Sorts by cpu, then memory, both descending.
pub fn rank_processes(processes: &mut [ProcessInfo]) {
    processes.sort_by(|a, b| {
        b.cpu
            .partial_cmp(&a.cpu)
            .unwrap_or(Ordering::Equal)
            .then(b.memory.partial_cmp(&a.memory).unwrap_or(Ordering::Equal))
    });
}
