// One-shot delay scheduling with a hybrid coarse/fine sleep strategy

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Remaining time below which the timer switches from coarse sleep slices to
/// fine ticks (roughly one display frame)
const FINE_THRESHOLD: Duration = Duration::from_millis(16);

/// Upper bound for a single coarse sleep slice, so long delays stay cancellable
/// without overshooting
const COARSE_CAP: Duration = Duration::from_millis(100);

/// Tick length used inside the fine stage
const FINE_TICK: Duration = Duration::from_micros(500);

/// Cancellation handle for a scheduled callback.
///
/// Cancelling before the callback fires suppresses it; cancelling afterwards
/// (or cancelling twice) is a no-op.
#[derive(Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// A handle with nothing scheduled behind it
    pub fn inert() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(true)),
        }
    }

    fn armed() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Timing diagnostics for the most recently fired callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingAccuracy {
    /// Requested delay in milliseconds
    pub expected_ms: f64,
    /// Observed delay in milliseconds
    pub actual_ms: f64,
    /// Absolute difference between the two
    pub accuracy_ms: f64,
}

/// Delivers a one-shot callback after a requested delay with better accuracy
/// than a single coarse sleep allows.
///
/// The worker recomputes remaining time from a captured absolute deadline on
/// every tick, so chained waits never accumulate drift. While more than
/// [`FINE_THRESHOLD`] remains it sleeps in coarse slices capped at
/// [`COARSE_CAP`]; inside the threshold it ticks at sub-millisecond
/// granularity up to the deadline.
///
/// There are no error paths: the worst case is extra jitter, never a missed
/// or duplicated callback.
pub struct PrecisionTimer {
    pending: Option<TimerHandle>,
    started_at: Option<Instant>,
    target_delay_ms: f64,
    fired_at: Arc<Mutex<Option<Instant>>>,
}

impl PrecisionTimer {
    pub fn new() -> Self {
        Self {
            pending: None,
            started_at: None,
            target_delay_ms: 0.0,
            fired_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedule `callback` to fire once, no earlier than `delay_ms` from now.
    ///
    /// A non-positive delay runs the callback immediately on the caller's
    /// thread without any scheduling overhead. Any previously pending
    /// callback on this timer is cancelled first.
    pub fn schedule_callback(
        &mut self,
        delay_ms: f64,
        callback: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        self.clear();

        // A NaN or infinite delay is misuse, not an error: treat it as zero
        // so it takes the immediate path instead of poisoning the deadline math
        let delay_ms = if delay_ms.is_finite() { delay_ms } else { 0.0 };

        let start = Instant::now();
        self.started_at = Some(start);
        self.target_delay_ms = delay_ms.max(0.0);
        if let Ok(mut fired) = self.fired_at.lock() {
            *fired = None;
        }

        if delay_ms <= 0.0 {
            if let Ok(mut fired) = self.fired_at.lock() {
                *fired = Some(Instant::now());
            }
            callback();
            return TimerHandle::inert();
        }

        let handle = TimerHandle::armed();
        let cancelled = Arc::clone(&handle.cancelled);
        let fired_at = Arc::clone(&self.fired_at);
        let deadline = start + Duration::from_secs_f64(delay_ms / 1000.0);

        thread::spawn(move || {
            loop {
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                if remaining > FINE_THRESHOLD {
                    // Stop short of the deadline so the fine stage takes over
                    thread::sleep((remaining - FINE_THRESHOLD).min(COARSE_CAP));
                } else {
                    thread::sleep(remaining.min(FINE_TICK));
                }
            }

            // A clear() racing the deadline must still win
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            if let Ok(mut fired) = fired_at.lock() {
                *fired = Some(Instant::now());
            }
            callback();
        });

        self.pending = Some(handle.clone());
        handle
    }

    /// Cancel any pending callback. Idempotent and safe to call at any time,
    /// including from within a firing callback.
    pub fn clear(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    /// Diagnostics for the last fired callback. Before anything fired, the
    /// observed delay is the time elapsed since scheduling.
    pub fn timing_accuracy(&self) -> TimingAccuracy {
        let expected_ms = self.target_delay_ms;
        let actual_ms = match self.started_at {
            Some(start) => {
                let end = self
                    .fired_at
                    .lock()
                    .ok()
                    .and_then(|fired| *fired)
                    .unwrap_or_else(Instant::now);
                end.saturating_duration_since(start).as_secs_f64() * 1000.0
            }
            None => 0.0,
        };

        TimingAccuracy {
            expected_ms,
            actual_ms,
            accuracy_ms: (expected_ms - actual_ms).abs(),
        }
    }
}

impl Default for PrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PrecisionTimer {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_callback_never_fires_early() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();

        timer.schedule_callback(30.0, move || {
            let _ = tx.send(start.elapsed());
        });

        let elapsed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(elapsed >= Duration::from_millis(30), "fired at {:?}", elapsed);
    }

    #[test]
    fn test_zero_delay_fires_inline() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        timer.schedule_callback(0.0, move || {
            let _ = tx.send(());
        });

        // No scheduling happened, the callback already ran
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_negative_delay_is_safe() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        timer.schedule_callback(-25.0, move || {
            let _ = tx.send(());
        });

        assert!(rx.try_recv().is_ok());
        assert_eq!(timer.timing_accuracy().expected_ms, 0.0);
    }

    #[test]
    fn test_non_finite_delay_is_safe() {
        let mut timer = PrecisionTimer::new();

        for delay in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let (tx, rx) = mpsc::channel();
            timer.schedule_callback(delay, move || {
                let _ = tx.send(());
            });

            // Degraded to the immediate path, never a panic
            assert!(rx.try_recv().is_ok());
            assert_eq!(timer.timing_accuracy().expected_ms, 0.0);
        }
    }

    #[test]
    fn test_cancellation_suppresses_callback() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        let handle = timer.schedule_callback(40.0, move || {
            let _ = tx.send(());
        });
        handle.cancel();

        thread::sleep(Duration::from_millis(120));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_suppresses_callback() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        timer.schedule_callback(40.0, move || {
            let _ = tx.send(());
        });
        timer.clear();
        timer.clear(); // idempotent

        thread::sleep(Duration::from_millis(120));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rescheduling_cancels_previous() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        let tx_first = tx.clone();
        timer.schedule_callback(30.0, move || {
            let _ = tx_first.send("first");
        });
        timer.schedule_callback(30.0, move || {
            let _ = tx.send("second");
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "second");
        thread::sleep(Duration::from_millis(60));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        let handle = timer.schedule_callback(5.0, move || {
            let _ = tx.send(());
        });

        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        handle.cancel();
        handle.cancel();
    }

    #[test]
    fn test_timing_accuracy_after_fire() {
        let mut timer = PrecisionTimer::new();
        let (tx, rx) = mpsc::channel();

        timer.schedule_callback(25.0, move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        // Give the worker a moment to record the fire time
        thread::sleep(Duration::from_millis(10));

        let accuracy = timer.timing_accuracy();
        assert_eq!(accuracy.expected_ms, 25.0);
        assert!(accuracy.actual_ms >= 25.0);
        assert_eq!(
            accuracy.accuracy_ms,
            (accuracy.expected_ms - accuracy.actual_ms).abs()
        );
    }

    #[test]
    fn test_inert_handle_is_cancelled() {
        let handle = TimerHandle::inert();
        assert!(handle.is_cancelled());
    }
}
