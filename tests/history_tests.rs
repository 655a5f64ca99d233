//! Bounded snapshot history.

mod common;

use common::FakeSource;
use herakles_sysmon::{History, Monitor};
use std::sync::Arc;
use std::thread;

#[tokio::test]
async fn test_capacity_plus_one_evicts_oldest() {
    let monitor = Monitor::builder()
        .source(FakeSource::new())
        .history_size(3)
        .build()
        .unwrap();

    let taken: Vec<_> = (0..4).map(|_| monitor.state().unwrap()).collect();

    let history = monitor.history();
    assert_eq!(history.len(), 3);
    for (kept, expected) in history.iter().zip(&taken[1..]) {
        assert!(Arc::ptr_eq(kept, expected));
    }
    assert!(Arc::ptr_eq(&monitor.latest().unwrap(), &taken[3]));
}

#[tokio::test]
async fn test_history_is_chronological() {
    let monitor = Monitor::builder()
        .source(FakeSource::new())
        .history_size(10)
        .build()
        .unwrap();

    for _ in 0..5 {
        monitor.state().unwrap();
    }
    let timestamps: Vec<_> = monitor.history().iter().map(|s| s.timestamp()).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_zero_history_size_is_rejected() {
    let result = Monitor::builder()
        .source(FakeSource::new())
        .history_size(0)
        .build();
    assert!(result.is_err());
}

#[test]
fn test_concurrent_pushes_respect_capacity() {
    let history = Arc::new(History::new(16));
    let monitor_rt = tokio::runtime::Runtime::new().unwrap();
    let monitor = monitor_rt.block_on(async {
        Monitor::builder()
            .source(FakeSource::new())
            .build()
            .unwrap()
    });
    let snapshot = monitor.state().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let history = Arc::clone(&history);
            let snapshot = Arc::clone(&snapshot);
            thread::spawn(move || {
                for _ in 0..50 {
                    history.push(Arc::clone(&snapshot));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(history.len(), 16);
    assert_eq!(history.capacity(), 16);
    assert_eq!(history.to_vec().len(), 16);
}
