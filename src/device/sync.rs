// Polling loop reconciling remote device state with local optimistic edits

use super::api::DeviceApi;
use super::state::SharedDeviceState;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Interval between the end of one poll round and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Slice length for the inter-round wait, so deactivation takes effect quickly
const IDLE_SLICE: Duration = Duration::from_millis(50);

/// Run one poll round: fan out over the five read endpoints, then apply the
/// results to shared state.
///
/// Returns `false` when the round was dropped because another round is in
/// flight (single-flight guard). Each read degrades independently to a safe
/// default on failure - partial success is the normal case, and nothing here
/// can abort the round. Results are discarded when `active` has been cleared
/// by the time they land.
pub fn run_poll_round<A: DeviceApi + ?Sized>(
    api: &A,
    state: &SharedDeviceState,
    in_flight: &AtomicBool,
    active: &AtomicBool,
) -> bool {
    if in_flight.swap(true, Ordering::SeqCst) {
        debug!("Poll round dropped: previous round still in flight");
        return false;
    }

    // Fan the five reads out in parallel; one slow endpoint must not hold
    // back the others. A panicking implementation degrades like a failure.
    let (channel_count, device_name, device_serial, mode, delay) = thread::scope(|s| {
        let channel_count = s.spawn(|| {
            api.channel_count().unwrap_or_else(|e| {
                debug!("Channel count poll failed: {}", e);
                0
            })
        });
        let device_name = s.spawn(|| {
            api.device_name().unwrap_or_else(|e| {
                debug!("Device name poll failed: {}", e);
                String::new()
            })
        });
        let device_serial = s.spawn(|| {
            api.serial_number().unwrap_or_else(|e| {
                debug!("Serial number poll failed: {}", e);
                String::new()
            })
        });
        let mode = s.spawn(|| {
            api.mode().unwrap_or_else(|e| {
                debug!("Mode poll failed: {}", e);
                "0".to_string()
            })
        });
        let delay = s.spawn(|| {
            api.delay().unwrap_or_else(|e| {
                debug!("Delay poll failed: {}", e);
                0
            })
        });

        (
            channel_count.join().unwrap_or(0),
            device_name.join().unwrap_or_default(),
            device_serial.join().unwrap_or_default(),
            mode.join().unwrap_or_else(|_| "0".to_string()),
            delay.join().unwrap_or(0),
        )
    });

    if active.load(Ordering::SeqCst) {
        let now = Instant::now();
        match state.lock() {
            Ok(mut device) => {
                // Identity fields have no local writer and apply unconditionally
                device.device_channel_count = channel_count;
                device.device_name = device_name;
                device.device_serial = device_serial;

                // User-editable fields go through the grace-window merge
                device.merge_mode(mode, now);
                device.merge_delay(delay, now);
            }
            Err(e) => warn!("Device state lock poisoned, dropping poll results: {}", e),
        }
    } else {
        debug!("Poll results discarded: sync loop no longer active");
    }

    in_flight.store(false, Ordering::SeqCst);
    true
}

/// Keeps the local [`DeviceState`](super::state::DeviceState) approximately
/// consistent with a controller that is reachable only via polling.
///
/// On activation the loop polls immediately, then repeats with trailing
/// scheduling: the next round is scheduled only after the previous one
/// settles, which bounds outstanding requests to one round regardless of
/// response latency.
pub struct DeviceSyncLoop<A: DeviceApi + 'static> {
    api: Arc<A>,
    state: SharedDeviceState,
    active: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    poll_interval: Duration,
    worker: Option<JoinHandle<()>>,
}

impl<A: DeviceApi + 'static> DeviceSyncLoop<A> {
    pub fn new(api: Arc<A>, state: SharedDeviceState) -> Self {
        Self {
            api,
            state,
            active: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
            poll_interval: POLL_INTERVAL,
            worker: None,
        }
    }

    /// Override the poll cadence (tests use short intervals)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> SharedDeviceState {
        Arc::clone(&self.state)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start polling: one immediate round, then fixed-interval repeats.
    /// Activating an already-active loop is a no-op.
    pub fn activate(&mut self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let active = Arc::clone(&self.active);
        let in_flight = Arc::clone(&self.in_flight);
        let interval = self.poll_interval;

        self.worker = Some(thread::spawn(move || {
            while active.load(Ordering::SeqCst) {
                run_poll_round(api.as_ref(), &state, &in_flight, &active);

                // Trailing cadence, sliced so deactivation cancels the
                // pending next round promptly
                let mut waited = Duration::ZERO;
                while waited < interval && active.load(Ordering::SeqCst) {
                    let slice = IDLE_SLICE.min(interval - waited);
                    thread::sleep(slice);
                    waited += slice;
                }
            }
        }));
    }

    /// Stop polling. Cancels the pending next round; an in-flight round is
    /// allowed to complete and its results are discarded. Resets the
    /// in-flight guard so a later reactivation starts clean.
    pub fn deactivate(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Request one extra poll round on the caller's thread. Dropped (returns
    /// `false`) when a round is already in flight.
    pub fn trigger_poll(&self) -> bool {
        run_poll_round(
            self.api.as_ref(),
            &self.state,
            &self.in_flight,
            &self.active,
        )
    }
}

impl<A: DeviceApi + 'static> Drop for DeviceSyncLoop<A> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::api::DeviceApiError;
    use crate::device::state::shared_device_state;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    /// Scriptable in-memory device
    struct MockApi {
        rounds: AtomicUsize,
        mode: Mutex<String>,
        delay: Mutex<u32>,
        fail_name: bool,
        /// When set, `channel_count` blocks until a message arrives
        block_on: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                rounds: AtomicUsize::new(0),
                mode: Mutex::new("1".to_string()),
                delay: Mutex::new(30),
                fail_name: false,
                block_on: Mutex::new(None),
            }
        }
    }

    impl DeviceApi for MockApi {
        fn channel_count(&self) -> Result<u16, DeviceApiError> {
            self.rounds.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.block_on.lock().unwrap().as_ref() {
                let _ = rx.recv();
            }
            Ok(24)
        }

        fn device_name(&self) -> Result<String, DeviceApiError> {
            if self.fail_name {
                Err(DeviceApiError::Http("name endpoint down".to_string()))
            } else {
                Ok("ALS Test Rig".to_string())
            }
        }

        fn serial_number(&self) -> Result<String, DeviceApiError> {
            Ok("ALS-0042".to_string())
        }

        fn mode(&self) -> Result<String, DeviceApiError> {
            Ok(self.mode.lock().unwrap().clone())
        }

        fn delay(&self) -> Result<u32, DeviceApiError> {
            Ok(*self.delay.lock().unwrap())
        }

        fn set_mode(&self, value: &str) -> Result<(), DeviceApiError> {
            *self.mode.lock().unwrap() = value.to_string();
            Ok(())
        }

        fn set_delay(&self, value: u32) -> Result<(), DeviceApiError> {
            *self.delay.lock().unwrap() = value;
            Ok(())
        }

        fn set_device_name(&self, _name: &str) -> Result<(), DeviceApiError> {
            Ok(())
        }

        fn ping(&self) -> Result<Duration, DeviceApiError> {
            Ok(Duration::from_millis(1))
        }
    }

    #[test]
    fn test_poll_round_applies_all_fields() {
        let api = MockApi::new();
        let state = shared_device_state();
        let in_flight = AtomicBool::new(false);
        let active = AtomicBool::new(true);

        assert!(run_poll_round(&api, &state, &in_flight, &active));

        let device = state.lock().unwrap();
        assert_eq!(device.device_channel_count, 24);
        assert_eq!(device.device_name, "ALS Test Rig");
        assert_eq!(device.device_serial, "ALS-0042");
        assert_eq!(device.mode(), "1");
        assert_eq!(device.delay(), 30);
    }

    #[test]
    fn test_failed_field_degrades_to_default() {
        let mut api = MockApi::new();
        api.fail_name = true;
        let state = shared_device_state();
        let in_flight = AtomicBool::new(false);
        let active = AtomicBool::new(true);

        assert!(run_poll_round(&api, &state, &in_flight, &active));

        // The failed field fell back; the rest of the round still landed
        let device = state.lock().unwrap();
        assert_eq!(device.device_name, "");
        assert_eq!(device.device_serial, "ALS-0042");
        assert_eq!(device.device_channel_count, 24);
    }

    #[test]
    fn test_reads_run_concurrently_within_a_round() {
        /// Every read endpoint takes 50ms to answer
        struct SlowApi;

        impl DeviceApi for SlowApi {
            fn channel_count(&self) -> Result<u16, DeviceApiError> {
                thread::sleep(Duration::from_millis(50));
                Ok(24)
            }
            fn device_name(&self) -> Result<String, DeviceApiError> {
                thread::sleep(Duration::from_millis(50));
                Ok("Slow Rig".to_string())
            }
            fn serial_number(&self) -> Result<String, DeviceApiError> {
                thread::sleep(Duration::from_millis(50));
                Ok("ALS-0099".to_string())
            }
            fn mode(&self) -> Result<String, DeviceApiError> {
                thread::sleep(Duration::from_millis(50));
                Ok("2".to_string())
            }
            fn delay(&self) -> Result<u32, DeviceApiError> {
                thread::sleep(Duration::from_millis(50));
                Ok(40)
            }
            fn set_mode(&self, _: &str) -> Result<(), DeviceApiError> {
                Ok(())
            }
            fn set_delay(&self, _: u32) -> Result<(), DeviceApiError> {
                Ok(())
            }
            fn set_device_name(&self, _: &str) -> Result<(), DeviceApiError> {
                Ok(())
            }
            fn ping(&self) -> Result<Duration, DeviceApiError> {
                Ok(Duration::from_millis(1))
            }
        }

        let state = shared_device_state();
        let in_flight = AtomicBool::new(false);
        let active = AtomicBool::new(true);

        let start = Instant::now();
        assert!(run_poll_round(&SlowApi, &state, &in_flight, &active));
        let elapsed = start.elapsed();

        // Five serialized 50ms reads would take 250ms; a parallel round
        // takes roughly one read's worth
        assert!(
            elapsed < Duration::from_millis(150),
            "round took {:?}, reads appear serialized",
            elapsed
        );

        let device = state.lock().unwrap();
        assert_eq!(device.device_channel_count, 24);
        assert_eq!(device.mode(), "2");
        assert_eq!(device.delay(), 40);
    }

    #[test]
    fn test_round_dropped_while_in_flight() {
        let api = MockApi::new();
        let state = shared_device_state();
        let in_flight = AtomicBool::new(true);
        let active = AtomicBool::new(true);

        assert!(!run_poll_round(&api, &state, &in_flight, &active));
        assert_eq!(api.rounds.load(Ordering::SeqCst), 0);
        // The guard is left untouched for the round that owns it
        assert!(in_flight.load(Ordering::SeqCst));
    }

    #[test]
    fn test_single_flight_under_concurrency() {
        let api = Arc::new(MockApi::new());
        let (release_tx, release_rx) = mpsc::channel();
        *api.block_on.lock().unwrap() = Some(release_rx);

        let state = shared_device_state();
        let in_flight = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));

        let worker = {
            let api = Arc::clone(&api);
            let state = Arc::clone(&state);
            let in_flight = Arc::clone(&in_flight);
            let active = Arc::clone(&active);
            thread::spawn(move || run_poll_round(api.as_ref(), &state, &in_flight, &active))
        };

        // Wait for the first round to claim the guard
        let deadline = Instant::now() + Duration::from_secs(2);
        while !in_flight.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "first round never started");
            thread::sleep(Duration::from_millis(1));
        }

        // A second request while one is in flight is dropped, not queued
        assert!(!run_poll_round(api.as_ref(), &state, &in_flight, &active));

        release_tx.send(()).unwrap();
        assert!(worker.join().unwrap());

        // Exactly one round's worth of requests went out
        assert_eq!(api.rounds.load(Ordering::SeqCst), 1);
        assert!(!in_flight.load(Ordering::SeqCst));
    }

    #[test]
    fn test_results_discarded_when_inactive() {
        let api = MockApi::new();
        let state = shared_device_state();
        let in_flight = AtomicBool::new(false);
        let active = AtomicBool::new(false);

        assert!(run_poll_round(&api, &state, &in_flight, &active));

        let device = state.lock().unwrap();
        assert_eq!(device.device_channel_count, 0);
        assert_eq!(device.device_name, "");
    }

    #[test]
    fn test_grace_window_against_live_rounds() {
        let api = MockApi::new();
        let state = shared_device_state();
        let in_flight = AtomicBool::new(false);
        let active = AtomicBool::new(true);

        // User flips mode to "3"; the device still reports "1"
        let t0 = Instant::now();
        state.lock().unwrap().set_mode_local_at("3".to_string(), t0);

        run_poll_round(&api, &state, &in_flight, &active);
        assert_eq!(state.lock().unwrap().mode(), "3");

        // Age the local stamp past the grace window, then poll again
        let aged = t0.checked_sub(Duration::from_millis(1500)).unwrap();
        state
            .lock()
            .unwrap()
            .set_mode_local_at("3".to_string(), aged);
        run_poll_round(&api, &state, &in_flight, &active);
        assert_eq!(state.lock().unwrap().mode(), "1");
    }

    #[test]
    fn test_activate_polls_immediately() {
        let api = Arc::new(MockApi::new());
        let mut sync = DeviceSyncLoop::new(Arc::clone(&api), shared_device_state())
            .with_interval(Duration::from_secs(60));

        sync.activate();

        let deadline = Instant::now() + Duration::from_secs(2);
        while api.rounds.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "no immediate poll on activation");
            thread::sleep(Duration::from_millis(5));
        }

        sync.deactivate();
        assert!(!sync.is_active());
        assert!(!sync.is_in_flight());
        assert_eq!(sync.state().lock().unwrap().device_channel_count, 24);
    }

    #[test]
    fn test_activate_twice_spawns_one_loop() {
        let api = Arc::new(MockApi::new());
        let mut sync = DeviceSyncLoop::new(Arc::clone(&api), shared_device_state())
            .with_interval(Duration::from_secs(60));

        sync.activate();
        sync.activate();

        thread::sleep(Duration::from_millis(100));
        sync.deactivate();

        assert_eq!(api.rounds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deactivate_cancels_pending_round() {
        let api = Arc::new(MockApi::new());
        let mut sync = DeviceSyncLoop::new(Arc::clone(&api), shared_device_state())
            .with_interval(Duration::from_millis(200));

        sync.activate();
        thread::sleep(Duration::from_millis(50));
        sync.deactivate();
        let rounds_at_stop = api.rounds.load(Ordering::SeqCst);

        // No further rounds after deactivation
        thread::sleep(Duration::from_millis(400));
        assert_eq!(api.rounds.load(Ordering::SeqCst), rounds_at_stop);
    }

    #[test]
    fn test_reactivation_after_deactivate() {
        let api = Arc::new(MockApi::new());
        let mut sync = DeviceSyncLoop::new(Arc::clone(&api), shared_device_state())
            .with_interval(Duration::from_secs(60));

        sync.activate();
        thread::sleep(Duration::from_millis(50));
        sync.deactivate();

        sync.activate();
        thread::sleep(Duration::from_millis(50));
        sync.deactivate();

        assert_eq!(api.rounds.load(Ordering::SeqCst), 2);
    }
}
