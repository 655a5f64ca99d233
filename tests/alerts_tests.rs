//! Threshold evaluation and alert fan-out through the `Monitor` facade.

mod common;

use common::{disk, receive, temperature, FailingSink, FakeSource, RecordingSink};
use herakles_sysmon::{AlertThresholds, Monitor};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_zero_limits_alert_on_everything_above_zero() {
    let source = FakeSource::new();
    source.set_cpu(50.0);
    let (sink, mut rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .thresholds(AlertThresholds::new(0.0, 0.0, 0.0).unwrap())
        .sink(sink)
        .build()
        .unwrap();

    let alerts = monitor.alerts().unwrap();
    assert_eq!(
        alerts,
        vec![
            "High CPU usage: 50%".to_string(),
            "High RAM usage: 20%".to_string(),
            "Low disk space on /: 40% used".to_string(),
            "Low disk space on /home: 55% used".to_string(),
        ]
    );

    let mut delivered = receive(&mut rx, alerts.len()).await;
    delivered.sort();
    let mut expected = alerts.clone();
    expected.sort();
    assert_eq!(delivered, expected);
}

#[tokio::test]
async fn test_values_equal_to_limit_do_not_alert() {
    let source = FakeSource::new();
    source.set_cpu(70.0);
    source.set_ram(70.0);
    source.set_disks(vec![disk("/", 80.0)]);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    assert!(monitor.alerts().unwrap().is_empty());
    assert_eq!(monitor.stats().alerts_generated.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_alert_order_is_cpu_ram_disks_temperatures() {
    let source = FakeSource::new();
    source.set_cpu(95.0);
    source.set_ram(91.0);
    source.set_disks(vec![disk("/", 97.0), disk("/var", 10.0)]);
    source.set_temperatures(vec![(
        "coretemp".to_string(),
        vec![temperature("Core 0", 99.0, Some(80.0), Some(95.0))],
    )]);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    let alerts = monitor.alerts().unwrap();
    assert_eq!(alerts.len(), 4);
    assert!(alerts[0].starts_with("High CPU usage"));
    assert!(alerts[1].starts_with("High RAM usage"));
    assert_eq!(alerts[2], "Low disk space on /: 97% used");
    assert!(alerts[3].starts_with("Critical temperature on coretemp/Core 0"));
}

#[tokio::test]
async fn test_critical_temperature_takes_precedence_over_high() {
    let source = FakeSource::new();
    source.set_temperatures(vec![(
        "coretemp".to_string(),
        vec![
            temperature("Core 0", 90.0, Some(80.0), Some(85.0)),
            temperature("Core 1", 82.0, Some(80.0), Some(85.0)),
            temperature("Core 2", 50.0, Some(80.0), Some(85.0)),
            temperature("Core 3", 200.0, None, None),
        ],
    )]);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    let alerts = monitor.alerts().unwrap();
    assert_eq!(
        alerts,
        vec![
            "Critical temperature on coretemp/Core 0: 90.0°C (critical 85.0°C)".to_string(),
            "High temperature on coretemp/Core 1: 82.0°C (high 80.0°C)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_failing_sink_does_not_block_siblings() {
    let source = FakeSource::new();
    source.set_cpu(99.0);
    let (sink, mut rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(std::sync::Arc::new(FailingSink))
        .sink(sink)
        .build()
        .unwrap();

    let alerts = monitor.alerts().unwrap();
    assert_eq!(alerts, vec!["High CPU usage: 99%".to_string()]);

    let delivered = receive(&mut rx, 1).await;
    assert_eq!(delivered, alerts);

    assert!(monitor.wait_for_deliveries(Duration::from_secs(1)).await);
    let stats = monitor.stats();
    assert_eq!(stats.alerts_delivered.load(Ordering::Relaxed), 1);
    assert_eq!(stats.sink_failures.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_cached_check_only_reads_disks_when_slow_tier_absent_or_forced() {
    let source = FakeSource::new();
    source.set_disks(vec![disk("/", 95.0)]);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    // No slow tier yet: disks are read and checked.
    let alerts = monitor.check(None, false).unwrap();
    assert_eq!(alerts, vec!["Low disk space on /: 95% used".to_string()]);
    assert_eq!(source.calls("disk_table"), 1);

    // Slow tier is fresh now: disks are skipped.
    assert!(monitor.check(None, false).unwrap().is_empty());

    // Forced: the cached slow tier is evaluated again.
    let alerts = monitor.check(None, true).unwrap();
    assert_eq!(alerts, vec!["Low disk space on /: 95% used".to_string()]);
    assert_eq!(source.calls("disk_table"), 1);
}

#[tokio::test]
async fn test_cached_check_ignores_temperatures() {
    let source = FakeSource::new();
    source.set_temperatures(vec![(
        "acpitz".to_string(),
        vec![temperature("temp1", 120.0, Some(80.0), Some(100.0))],
    )]);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    assert!(monitor.check(None, true).unwrap().is_empty());
    assert_eq!(source.calls("temperatures"), 0);
}

#[tokio::test]
async fn test_cpu_failure_surfaces_from_check() {
    let source = FakeSource::new();
    source.fail_cpu.store(true, Ordering::SeqCst);
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(source.clone())
        .sink(sink)
        .build()
        .unwrap();

    assert!(monitor.check(None, false).is_err());
    assert!(monitor.alerts().is_err());
    assert!(monitor.history().is_empty());
}

#[test]
fn test_build_outside_runtime_fails() {
    let result = Monitor::builder().source(FakeSource::new()).build();
    assert!(result.is_err());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_zero_limits_alert_on_the_local_host() {
    let (sink, _rx) = RecordingSink::new();
    let monitor = Monitor::builder()
        .source(std::sync::Arc::new(herakles_sysmon::ProcfsSource::new()))
        .thresholds(AlertThresholds::new(0.0, 0.0, 0.0).unwrap())
        .sink(sink)
        .build()
        .unwrap();

    let alerts = monitor.alerts().unwrap();
    assert!(!alerts.is_empty());
    assert!(alerts.iter().any(|a| a.starts_with("High RAM usage")));
}
