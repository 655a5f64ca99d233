//! Background polling scheduler.
//!
//! Owns at most one polling task. Each cycle runs a cheap threshold check,
//! sweeps expired cache entries and, once per interval, assembles a full
//! snapshot. Cycle work runs on the blocking pool so slow sources never stall
//! the runtime; both errors and panics count as failures. Five consecutive
//! failures halt the loop and leave the scheduler in `Halted`.

use rand::Rng;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::alerts::AlertEvaluator;
use crate::error::{MonitorError, Result};

/// Consecutive failures after which the loop halts itself.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// How long `stop` waits for the loop before aborting it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_TICK: Duration = Duration::from_secs(1);
const MAX_JITTER: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerStatus {
    Stopped = 0,
    Running = 1,
    /// The loop stopped itself after too many consecutive failures.
    Halted = 2,
}

impl SchedulerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SchedulerStatus::Running,
            2 => SchedulerStatus::Halted,
            _ => SchedulerStatus::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerStatus::Stopped => "stopped",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Halted => "halted",
        }
    }
}

/// Delay before the next cycle after `errors` consecutive failures.
pub fn backoff_delay(interval: Duration, errors: u32) -> Duration {
    let factor = 2u32.saturating_pow(errors);
    interval
        .saturating_mul(factor)
        .min(interval.saturating_mul(10))
}

/// Random extra delay, at most 250ms and at most a quarter of the interval.
pub fn jitter(interval: Duration) -> Duration {
    let cap = MAX_JITTER.min(interval / 4).as_micros() as u64;
    if cap == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::thread_rng().gen_range(0..=cap))
}

/// Pause between successful cycles.
pub fn tick(interval: Duration) -> Duration {
    MAX_TICK.min(interval / 10)
}

struct Control {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct LoopContext {
    evaluator: Arc<AlertEvaluator>,
    interval: Duration,
    status: Arc<AtomicU8>,
    consecutive_errors: Arc<AtomicU32>,
}

pub struct Scheduler {
    evaluator: Arc<AlertEvaluator>,
    interval: Duration,
    stop_timeout: Duration,
    status: Arc<AtomicU8>,
    consecutive_errors: Arc<AtomicU32>,
    control: Mutex<Control>,
    span: Span,
}

impl Scheduler {
    pub fn new(evaluator: Arc<AlertEvaluator>, interval: Duration, span: Span) -> Self {
        Self {
            evaluator,
            interval,
            stop_timeout: STOP_TIMEOUT,
            status: Arc::new(AtomicU8::new(SchedulerStatus::Stopped as u8)),
            consecutive_errors: Arc::new(AtomicU32::new(0)),
            control: Mutex::new(Control {
                token: CancellationToken::new(),
                handle: None,
            }),
            span,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.status() == SchedulerStatus::Running
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Launches the polling loop unless it is already running.
    ///
    /// A halted scheduler can be started again; the failure counter restarts
    /// at zero.
    pub async fn start(&self) {
        let mut control = self.control.lock().await;
        if self.is_running() {
            debug!("Monitoring already running, start ignored");
            return;
        }

        if let Some(previous) = control.handle.take() {
            // Only a halted loop leaves a handle behind; it has already returned.
            previous.abort();
        }

        let token = CancellationToken::new();
        control.token = token.clone();
        self.consecutive_errors.store(0, Ordering::SeqCst);
        self.status
            .store(SchedulerStatus::Running as u8, Ordering::SeqCst);

        let ctx = LoopContext {
            evaluator: Arc::clone(&self.evaluator),
            interval: self.interval,
            status: Arc::clone(&self.status),
            consecutive_errors: Arc::clone(&self.consecutive_errors),
        };
        control.handle = Some(tokio::spawn(
            run_loop(ctx, token).instrument(self.span.clone()),
        ));

        info!(
            "Monitoring started in background (interval {:.3}s)",
            self.interval.as_secs_f64()
        );
    }

    /// Signals the loop to stop and waits up to the stop timeout for it.
    ///
    /// Known race: if the loop does not exit in time its task is aborted and
    /// `stop` returns anyway. A cycle already executing on the blocking pool
    /// cannot be interrupted and finishes in the background; its results are
    /// discarded except for cache and history updates it makes.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        let Some(mut handle) = control.handle.take() else {
            debug!("Monitoring not running, stop ignored");
            return;
        };

        control.token.cancel();
        match tokio::time::timeout(self.stop_timeout, &mut handle).await {
            Ok(_) => debug!("Monitoring loop joined"),
            Err(_) => {
                warn!(
                    "Monitoring loop did not exit within {:?}, aborting it",
                    self.stop_timeout
                );
                handle.abort();
            }
        }

        self.status
            .store(SchedulerStatus::Stopped as u8, Ordering::SeqCst);
        info!("Monitoring stopped.");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Ok(control) = self.control.try_lock() {
            control.token.cancel();
        }
    }
}

/// Sleeps for `duration`; returns true if cancelled first.
async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// One cycle; returns whether a full snapshot was taken.
fn run_cycle(evaluator: &AlertEvaluator, snapshot_due: bool) -> Result<bool> {
    evaluator.check(None, false)?;

    let evicted = evaluator.assembler().cache().clear_expired();
    if evicted > 0 {
        debug!("Evicted {} expired cache entries", evicted);
    }

    if snapshot_due {
        let snapshot = evaluator.assembler().snapshot()?;
        evaluator.check_sensors(&snapshot);
        return Ok(true);
    }
    Ok(false)
}

async fn run_loop(ctx: LoopContext, token: CancellationToken) {
    let stats = Arc::clone(ctx.evaluator.assembler().stats());
    let tick = tick(ctx.interval);
    let mut last_full: Option<Instant> = None;

    while !token.is_cancelled() {
        let snapshot_due = last_full.map_or(true, |t| t.elapsed() >= ctx.interval);
        let evaluator = Arc::clone(&ctx.evaluator);
        let span = Span::current();
        let started = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || {
            span.in_scope(|| run_cycle(&evaluator, snapshot_due))
        })
        .await
        .unwrap_or_else(|e| Err(MonitorError::Panicked(e.to_string())));

        stats.record_cycle(started.elapsed().as_secs_f64());

        match outcome {
            Ok(took_snapshot) => {
                if took_snapshot {
                    last_full = Some(Instant::now());
                }
                if sleep_or_cancel(tick, &token).await {
                    break;
                }
                ctx.consecutive_errors.store(0, Ordering::SeqCst);
            }
            Err(e) => {
                stats.record_cycle_failure();
                let errors = ctx.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
                error!(
                    "Error in monitoring loop ({}/{}): {}",
                    errors, MAX_CONSECUTIVE_ERRORS, e
                );

                if errors >= MAX_CONSECUTIVE_ERRORS {
                    ctx.status
                        .store(SchedulerStatus::Halted as u8, Ordering::SeqCst);
                    error!(
                        "Monitoring halted after {} consecutive failures",
                        errors
                    );
                    return;
                }

                let delay = backoff_delay(ctx.interval, errors) + jitter(ctx.interval);
                debug!("Backing off for {:?}", delay);
                if sleep_or_cancel(delay, &token).await {
                    break;
                }
            }
        }
    }

    info!("Monitoring loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let interval = Duration::from_secs(60);
        assert_eq!(backoff_delay(interval, 1), Duration::from_secs(120));
        assert_eq!(backoff_delay(interval, 2), Duration::from_secs(240));
        assert_eq!(backoff_delay(interval, 3), Duration::from_secs(480));
        assert_eq!(backoff_delay(interval, 4), Duration::from_secs(600));
        assert_eq!(backoff_delay(interval, 40), Duration::from_secs(600));
    }

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..100 {
            assert!(jitter(Duration::from_secs(60)) <= MAX_JITTER);
            assert!(jitter(Duration::from_millis(100)) <= Duration::from_millis(25));
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_tick_is_capped() {
        assert_eq!(tick(Duration::from_secs(60)), Duration::from_secs(1));
        assert_eq!(tick(Duration::from_secs(5)), Duration::from_millis(500));
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            SchedulerStatus::Stopped,
            SchedulerStatus::Running,
            SchedulerStatus::Halted,
        ] {
            assert_eq!(SchedulerStatus::from_u8(s as u8), s);
        }
    }
}
