//! Host metric source backed by /proc and /sys.

use tracing::debug;

use crate::collectors::{fans, filesystem, gpu, netdev, power, thermal};
use crate::error::SourceError;
use crate::process::ProcessScanner;
use crate::source::{
    format_uptime, BatteryStatus, DiskUsage, FanReading, InterfaceTable, MetricSource,
    NetworkTotals, ProcessInfo, SensorTable, TemperatureReading,
};
use crate::system::{read_memory_info, read_uptime, CpuSampler};

/// Reads the local Linux host.
pub struct ProcfsSource {
    cpu: CpuSampler,
    processes: ProcessScanner,
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self {
            cpu: CpuSampler::new(),
            processes: ProcessScanner::default(),
        }
    }
}

impl MetricSource for ProcfsSource {
    fn cpu_percent(&self) -> Result<f64, SourceError> {
        self.cpu.cpu_percent()
    }

    fn ram_percent(&self) -> Result<f64, SourceError> {
        Ok(read_memory_info()?.used_percent())
    }

    fn disk_table(&self) -> Result<Vec<DiskUsage>, SourceError> {
        filesystem::read_disk_table()
    }

    fn gpu_list(&self) -> Result<Vec<String>, SourceError> {
        gpu::collect_gpus()
    }

    fn uptime_string(&self) -> Result<String, SourceError> {
        read_uptime().map(format_uptime)
    }

    fn network_totals(&self) -> Result<NetworkTotals, SourceError> {
        Ok(netdev::totals(&netdev::read_netdev_stats()?))
    }

    fn network_per_interface(&self) -> Result<InterfaceTable, SourceError> {
        netdev::read_netdev_stats()
    }

    fn battery(&self) -> Result<Option<BatteryStatus>, SourceError> {
        power::collect_battery()
    }

    fn temperatures(&self) -> Result<SensorTable<TemperatureReading>, SourceError> {
        thermal::collect_temperatures()
    }

    fn fans(&self) -> Result<SensorTable<FanReading>, SourceError> {
        fans::collect_fans()
    }

    fn top_processes(&self, n: usize) -> Result<Vec<ProcessInfo>, SourceError> {
        let total = read_memory_info()?.total_bytes;
        let top = self.processes.top_processes(n, total);
        debug!(count = top.len(), "Scanned process table");
        Ok(top)
    }
}
