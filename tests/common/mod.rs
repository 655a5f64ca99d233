//! Shared fixtures for integration tests: a scripted metric source and
//! channel-backed alert sinks.

#![allow(dead_code)]

use async_trait::async_trait;
use herakles_sysmon::error::{SinkError, SourceError};
use herakles_sysmon::sinks::AlertSink;
use herakles_sysmon::source::{
    BatteryStatus, DiskUsage, FanReading, InterfaceCounters, InterfaceTable, MetricSource,
    NetworkTotals, ProcessInfo, SensorTable, TemperatureReading,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Metric source with settable values, failure toggles and call counters.
pub struct FakeSource {
    pub cpu: Mutex<f64>,
    pub ram: Mutex<f64>,
    pub disks: Mutex<Vec<DiskUsage>>,
    pub temperatures: Mutex<SensorTable<TemperatureReading>>,
    pub fail_cpu: AtomicBool,
    pub fail_optional: AtomicBool,
    pub panic_cpu: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            cpu: Mutex::new(10.0),
            ram: Mutex::new(20.0),
            disks: Mutex::new(vec![disk("/", 40.0), disk("/home", 55.0)]),
            temperatures: Mutex::new(Vec::new()),
            fail_cpu: AtomicBool::new(false),
            fail_optional: AtomicBool::new(false),
            panic_cpu: AtomicBool::new(false),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_cpu(&self, value: f64) {
        *self.cpu.lock().unwrap() = value;
    }

    pub fn set_ram(&self, value: f64) {
        *self.ram.lock().unwrap() = value;
    }

    pub fn set_disks(&self, disks: Vec<DiskUsage>) {
        *self.disks.lock().unwrap() = disks;
    }

    pub fn set_temperatures(&self, table: SensorTable<TemperatureReading>) {
        *self.temperatures.lock().unwrap() = table;
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    fn optional<T>(&self, value: T) -> Result<T, SourceError> {
        if self.fail_optional.load(Ordering::SeqCst) {
            Err(SourceError::Unavailable("scripted"))
        } else {
            Ok(value)
        }
    }
}

impl MetricSource for FakeSource {
    fn cpu_percent(&self) -> Result<f64, SourceError> {
        self.record("cpu_percent");
        if self.panic_cpu.load(Ordering::SeqCst) {
            panic!("scripted panic");
        }
        if self.fail_cpu.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("cpu"));
        }
        Ok(*self.cpu.lock().unwrap())
    }

    fn ram_percent(&self) -> Result<f64, SourceError> {
        self.record("ram_percent");
        Ok(*self.ram.lock().unwrap())
    }

    fn disk_table(&self) -> Result<Vec<DiskUsage>, SourceError> {
        self.record("disk_table");
        self.optional(self.disks.lock().unwrap().clone())
    }

    fn gpu_list(&self) -> Result<Vec<String>, SourceError> {
        self.record("gpu_list");
        self.optional(vec!["Fake GPU".to_string()])
    }

    fn uptime_string(&self) -> Result<String, SourceError> {
        self.record("uptime_string");
        self.optional("1d 2h 3m".to_string())
    }

    fn network_totals(&self) -> Result<NetworkTotals, SourceError> {
        self.record("network_totals");
        self.optional(NetworkTotals {
            bytes_sent: 10 * 1024 * 1024,
            bytes_recv: 20 * 1024 * 1024,
        })
    }

    fn network_per_interface(&self) -> Result<InterfaceTable, SourceError> {
        self.record("network_per_interface");
        self.optional(vec![
            (
                "lo".to_string(),
                InterfaceCounters {
                    bytes_sent: 1024 * 1024,
                    bytes_recv: 1024 * 1024,
                    ..Default::default()
                },
            ),
            (
                "eth0".to_string(),
                InterfaceCounters {
                    bytes_sent: 9 * 1024 * 1024,
                    bytes_recv: 19 * 1024 * 1024,
                    packets_sent: 100,
                    packets_recv: 200,
                    ..Default::default()
                },
            ),
        ])
    }

    fn battery(&self) -> Result<Option<BatteryStatus>, SourceError> {
        self.record("battery");
        self.optional(None)
    }

    fn temperatures(&self) -> Result<SensorTable<TemperatureReading>, SourceError> {
        self.record("temperatures");
        self.optional(self.temperatures.lock().unwrap().clone())
    }

    fn fans(&self) -> Result<SensorTable<FanReading>, SourceError> {
        self.record("fans");
        self.optional(vec![(
            "thinkpad".to_string(),
            vec![FanReading {
                label: "fan1".to_string(),
                current: 2400.0,
            }],
        )])
    }

    fn top_processes(&self, n: usize) -> Result<Vec<ProcessInfo>, SourceError> {
        self.record("top_processes");
        let all = vec![
            ProcessInfo {
                pid: 1,
                name: "init".to_string(),
                cpu: 0.5,
                memory: 0.1,
            },
            ProcessInfo {
                pid: 42,
                name: "postgres".to_string(),
                cpu: 0.2,
                memory: 3.5,
            },
        ];
        self.optional(all.into_iter().take(n).collect())
    }
}

pub fn disk(mount: &str, percent: f64) -> DiskUsage {
    DiskUsage {
        mount: mount.to_string(),
        percent,
        total: 100 * 1024 * 1024 * 1024,
        used: (percent * 1024.0 * 1024.0 * 1024.0) as u64,
        free: ((100.0 - percent) * 1024.0 * 1024.0 * 1024.0) as u64,
    }
}

pub fn temperature(label: &str, current: f64, high: Option<f64>, critical: Option<f64>) -> TemperatureReading {
    TemperatureReading {
        label: label.to_string(),
        current,
        high,
        critical,
    }
}

/// Forwards every delivered alert into a channel.
pub struct RecordingSink {
    tx: UnboundedSender<String>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        self.tx
            .send(alert.to_string())
            .map_err(|_| SinkError::Rejected("receiver dropped".to_string()))
    }
}

/// Rejects every alert.
pub struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _alert: &str) -> Result<(), SinkError> {
        Err(SinkError::Rejected("scripted failure".to_string()))
    }
}

/// Receives `count` alerts, failing the test if they do not arrive within a second.
pub async fn receive(rx: &mut UnboundedReceiver<String>, count: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let alert = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("alert not delivered in time")
            .expect("channel closed");
        out.push(alert);
    }
    out
}
