//! Tier bundles and the immutable system snapshot.
//!
//! Each cache tier stores one bundle. A `Snapshot` joins the three bundles
//! with a capture timestamp and never changes afterwards. `to_record` is the
//! stable export shape consumed by dashboards and log shippers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::cache::MetricGroup;
use crate::source::{
    BatteryStatus, DiskUsage, FanReading, InterfaceTable, NetworkTotals, ProcessInfo, SensorTable,
    TemperatureReading,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Fast tier: refreshed about every second.
#[derive(Debug, Clone, PartialEq)]
pub struct FastMetrics {
    pub cpu: f64,
    pub ram: f64,
    pub interfaces: InterfaceTable,
}

/// Medium tier: sensors and the busiest processes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediumMetrics {
    pub temperatures: SensorTable<TemperatureReading>,
    pub fans: SensorTable<FanReading>,
    pub top_processes: Vec<ProcessInfo>,
}

/// Slow tier: expensive, low-volatility metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlowMetrics {
    pub disks: Vec<DiskUsage>,
    pub gpus: Vec<String>,
    pub uptime: Option<String>,
    pub network: Option<NetworkTotals>,
    pub battery: Option<BatteryStatus>,
}

/// Value stored in the tiered cache, one variant per tier.
#[derive(Debug, Clone)]
pub enum GroupBundle {
    Fast(Arc<FastMetrics>),
    Medium(Arc<MediumMetrics>),
    Slow(Arc<SlowMetrics>),
}

impl GroupBundle {
    pub fn group(&self) -> MetricGroup {
        match self {
            GroupBundle::Fast(_) => MetricGroup::Fast,
            GroupBundle::Medium(_) => MetricGroup::Medium,
            GroupBundle::Slow(_) => MetricGroup::Slow,
        }
    }
}

/// Immutable composite of all tiers at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    fast: Arc<FastMetrics>,
    medium: Arc<MediumMetrics>,
    slow: Arc<SlowMetrics>,
}

impl Snapshot {
    pub fn new(
        timestamp: DateTime<Utc>,
        fast: Arc<FastMetrics>,
        medium: Arc<MediumMetrics>,
        slow: Arc<SlowMetrics>,
    ) -> Self {
        Self {
            timestamp,
            fast,
            medium,
            slow,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn cpu(&self) -> f64 {
        self.fast.cpu
    }

    pub fn ram(&self) -> f64 {
        self.fast.ram
    }

    pub fn fast(&self) -> &FastMetrics {
        &self.fast
    }

    pub fn medium(&self) -> &MediumMetrics {
        &self.medium
    }

    pub fn slow(&self) -> &SlowMetrics {
        &self.slow
    }

    pub fn disks(&self) -> &[DiskUsage] {
        &self.slow.disks
    }

    pub fn temperatures(&self) -> &SensorTable<TemperatureReading> {
        &self.medium.temperatures
    }

    /// Builds the exported record.
    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            timestamp: self
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            cpu: self.fast.cpu,
            ram: self.fast.ram,
            disks: self
                .slow
                .disks
                .iter()
                .map(|d| (d.mount.clone(), DiskRecord::from(d)))
                .collect(),
            gpus: self.slow.gpus.clone(),
            uptime: self.slow.uptime.clone(),
            network: self.slow.network.map(|n| NetworkRecord {
                sent_mb: n.bytes_sent as f64 / BYTES_PER_MB,
                recv_mb: n.bytes_recv as f64 / BYTES_PER_MB,
            }),
            battery: self.slow.battery,
            top_processes: self.medium.top_processes.clone(),
            temperatures: self.medium.temperatures.clone(),
            fans: self.medium.fans.clone(),
            network_interfaces: self
                .fast
                .interfaces
                .iter()
                .map(|(name, c)| {
                    (
                        name.clone(),
                        InterfaceRecord {
                            sent_mb: c.bytes_sent as f64 / BYTES_PER_MB,
                            recv_mb: c.bytes_recv as f64 / BYTES_PER_MB,
                            packets_sent: c.packets_sent,
                            packets_recv: c.packets_recv,
                            errin: c.errin,
                            errout: c.errout,
                            dropin: c.dropin,
                            dropout: c.dropout,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Serializes the exported record as JSON.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        let record = self.to_record();
        if pretty {
            serde_json::to_string_pretty(&record)
        } else {
            serde_json::to_string(&record)
        }
    }
}

/// Stable export shape of a snapshot. Field names and nesting are part of
/// the external contract.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRecord {
    pub timestamp: String,
    pub cpu: f64,
    pub ram: f64,
    #[serde(serialize_with = "ordered_map")]
    pub disks: Vec<(String, DiskRecord)>,
    pub gpus: Vec<String>,
    pub uptime: Option<String>,
    pub network: Option<NetworkRecord>,
    pub battery: Option<BatteryStatus>,
    pub top_processes: Vec<ProcessInfo>,
    #[serde(serialize_with = "ordered_map")]
    pub temperatures: Vec<(String, Vec<TemperatureReading>)>,
    #[serde(serialize_with = "ordered_map")]
    pub fans: Vec<(String, Vec<FanReading>)>,
    #[serde(serialize_with = "ordered_map")]
    pub network_interfaces: Vec<(String, InterfaceRecord)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskRecord {
    pub percent: f64,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
}

impl From<&DiskUsage> for DiskRecord {
    fn from(d: &DiskUsage) -> Self {
        Self {
            percent: round_to(d.percent, 1),
            total_gb: round_to(d.total as f64 / BYTES_PER_GB, 2),
            used_gb: round_to(d.used as f64 / BYTES_PER_GB, 2),
            free_gb: round_to(d.free as f64 / BYTES_PER_GB, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkRecord {
    pub sent_mb: f64,
    pub recv_mb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterfaceRecord {
    pub sent_mb: f64,
    pub recv_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Serializes key/value pairs as a map, keeping their order.
#[allow(clippy::ptr_arg)]
fn ordered_map<S, K, V>(entries: &Vec<(K, V)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Serialize,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== System State @ {} ===",
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(
            f,
            "CPU: {:.0}% | RAM: {:.0}% | Uptime: {}",
            self.fast.cpu,
            self.fast.ram,
            self.slow.uptime.as_deref().unwrap_or("N/A")
        )?;
        match self.slow.network {
            Some(n) => writeln!(
                f,
                "Network: Sent {:.1} MB / Recv {:.1} MB",
                n.bytes_sent as f64 / BYTES_PER_MB,
                n.bytes_recv as f64 / BYTES_PER_MB
            )?,
            None => writeln!(f, "Network: N/A")?,
        }
        match self.slow.battery {
            Some(b) => writeln!(f, "Battery: {}% (plugged: {})", b.percent, b.plugged)?,
            None => writeln!(f, "Battery: N/A")?,
        }

        writeln!(f, "Disks:")?;
        for d in &self.slow.disks {
            writeln!(
                f,
                "  {}: {:.0}% used ({:.1} GB free)",
                d.mount,
                d.percent,
                d.free as f64 / BYTES_PER_GB
            )?;
        }

        writeln!(f, "GPUs: {}", self.slow.gpus.join(", "))?;

        writeln!(f, "Temperatures:")?;
        for (sensor, readings) in &self.medium.temperatures {
            let list: Vec<String> = readings
                .iter()
                .map(|t| format!("{} {}°C", t.label, t.current))
                .collect();
            writeln!(f, "  {}: {}", sensor, list.join(", "))?;
        }

        writeln!(f, "Fans:")?;
        for (sensor, readings) in &self.medium.fans {
            let list: Vec<String> = readings
                .iter()
                .map(|r| format!("{} {} RPM", r.label, r.current))
                .collect();
            writeln!(f, "  {}: {}", sensor, list.join(", "))?;
        }

        writeln!(f, "Network Interfaces:")?;
        for (name, c) in &self.fast.interfaces {
            writeln!(
                f,
                "  {}: Sent {:.1} MB / Recv {:.1} MB",
                name,
                c.bytes_sent as f64 / BYTES_PER_MB,
                c.bytes_recv as f64 / BYTES_PER_MB
            )?;
        }

        writeln!(f, "Top processes:")?;
        for p in &self.medium.top_processes {
            writeln!(
                f,
                "  {} (PID {}) CPU: {:.1}% | RAM: {:.1}%",
                p.name, p.pid, p.cpu, p.memory
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InterfaceCounters;

    fn sample() -> Snapshot {
        let fast = FastMetrics {
            cpu: 12.5,
            ram: 40.0,
            interfaces: vec![(
                "eth0".to_string(),
                InterfaceCounters {
                    bytes_sent: 2 * 1024 * 1024,
                    bytes_recv: 1024 * 1024,
                    packets_sent: 10,
                    packets_recv: 20,
                    ..Default::default()
                },
            )],
        };
        let slow = SlowMetrics {
            disks: vec![
                DiskUsage {
                    mount: "/".to_string(),
                    percent: 55.55,
                    total: 100 * 1024 * 1024 * 1024,
                    used: 55 * 1024 * 1024 * 1024,
                    free: 45 * 1024 * 1024 * 1024,
                },
                DiskUsage {
                    mount: "/boot".to_string(),
                    percent: 10.0,
                    total: 1024 * 1024 * 1024,
                    used: 100 * 1024 * 1024,
                    free: 924 * 1024 * 1024,
                },
            ],
            gpus: vec!["Intel UHD 620".to_string()],
            uptime: Some("1d 2h 3m".to_string()),
            network: Some(NetworkTotals {
                bytes_sent: 3 * 1024 * 1024,
                bytes_recv: 4 * 1024 * 1024,
            }),
            battery: None,
        };
        Snapshot::new(
            Utc::now(),
            Arc::new(fast),
            Arc::new(MediumMetrics::default()),
            Arc::new(slow),
        )
    }

    #[test]
    fn test_record_field_names() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json(false).unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "timestamp",
            "cpu",
            "ram",
            "disks",
            "gpus",
            "uptime",
            "network",
            "battery",
            "top_processes",
            "temperatures",
            "fans",
            "network_interfaces",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
        assert_eq!(obj.len(), 12);
        assert!(obj["battery"].is_null());
        assert_eq!(obj["network"]["sent_mb"], 3.0);
        assert_eq!(obj["network_interfaces"]["eth0"]["packets_recv"], 20);
    }

    #[test]
    fn test_disk_record_rounding() {
        let record = sample().to_record();
        let (mount, disk) = &record.disks[0];
        assert_eq!(mount, "/");
        assert_eq!(disk.percent, 55.6);
        assert_eq!(disk.total_gb, 100.0);
        assert_eq!(disk.free_gb, 45.0);
    }

    #[test]
    fn test_disks_keep_enumeration_order() {
        let json = sample().to_json(false).unwrap();
        let root = json.find("\"/\"").unwrap();
        let boot = json.find("\"/boot\"").unwrap();
        assert!(root < boot);
    }

    #[test]
    fn test_display_contains_sections() {
        let text = sample().to_string();
        assert!(text.starts_with("=== System State @ "));
        assert!(text.contains("CPU: 12% | RAM: 40% | Uptime: 1d 2h 3m"));
        assert!(text.contains("Battery: N/A"));
        assert!(text.contains("/: 56% used (45.0 GB free)"));
        assert!(text.contains("eth0: Sent 2.0 MB / Recv 1.0 MB"));
    }
}
