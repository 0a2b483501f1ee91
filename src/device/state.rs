// Shared device state with explicit writer provenance per field

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Grace window after a local change during which conflicting polled values
/// for the same field are suppressed
pub const SYNC_GRACE: Duration = Duration::from_millis(1000);

/// Who wrote a synchronized field last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Local,
    Remote,
}

/// A field written by both the user (optimistic, immediate) and the poll loop
/// (delayed). Local writes stamp the change time; the stamp drives the
/// grace-window merge in [`SyncedField::merge`].
#[derive(Debug, Clone)]
pub struct SyncedField<T> {
    value: T,
    source: FieldSource,
    last_local_change: Option<Instant>,
}

impl<T: Clone + PartialEq> SyncedField<T> {
    /// Field seeded with a remote-origin value
    pub fn remote(value: T) -> Self {
        Self {
            value,
            source: FieldSource::Remote,
            last_local_change: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn source(&self) -> FieldSource {
        self.source
    }

    /// Apply an optimistic local write, stamping now as the change time
    pub fn set_local(&mut self, value: T) {
        self.set_local_at(value, Instant::now());
    }

    /// Local write with an explicit change time (deterministic tests)
    pub fn set_local_at(&mut self, value: T, at: Instant) {
        self.value = value;
        self.source = FieldSource::Local;
        self.last_local_change = Some(at);
    }

    /// Merge a polled value against the current one.
    ///
    /// The incoming value is discarded (returns `false`) only when a local
    /// change is younger than `grace` AND the polled value disagrees with it.
    /// In every other case the polled value is applied, which guarantees
    /// convergence to the remote value once the window elapses or the remote
    /// catches up.
    pub fn merge(&mut self, incoming: T, grace: Duration, now: Instant) -> bool {
        if let Some(changed_at) = self.last_local_change
            && now.saturating_duration_since(changed_at) < grace
            && incoming != self.value
        {
            return false;
        }

        self.value = incoming;
        self.source = FieldSource::Remote;
        true
    }
}

/// Local view of the remote controller's state.
///
/// `mode` and `delay` are the two fields the user can change locally, so they
/// carry provenance; the identity fields only ever arrive from polls.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub device_name: String,
    pub device_serial: String,
    pub device_channel_count: u16,
    mode: SyncedField<String>,
    delay: SyncedField<u32>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            device_serial: String::new(),
            device_channel_count: 0,
            mode: SyncedField::remote("0".to_string()),
            delay: SyncedField::remote(0),
        }
    }
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &str {
        self.mode.get()
    }

    pub fn delay(&self) -> u32 {
        *self.delay.get()
    }

    pub fn mode_source(&self) -> FieldSource {
        self.mode.source()
    }

    pub fn delay_source(&self) -> FieldSource {
        self.delay.source()
    }

    pub fn set_mode_local(&mut self, mode: String) {
        self.mode.set_local(mode);
    }

    pub fn set_delay_local(&mut self, delay: u32) {
        self.delay.set_local(delay);
    }

    pub fn set_mode_local_at(&mut self, mode: String, at: Instant) {
        self.mode.set_local_at(mode, at);
    }

    pub fn set_delay_local_at(&mut self, delay: u32, at: Instant) {
        self.delay.set_local_at(delay, at);
    }

    /// Apply a polled mode under the grace-window rule
    pub fn merge_mode(&mut self, incoming: String, now: Instant) -> bool {
        self.mode.merge(incoming, SYNC_GRACE, now)
    }

    /// Apply a polled delay under the grace-window rule
    pub fn merge_delay(&mut self, incoming: u32, now: Instant) -> bool {
        self.delay.merge(incoming, SYNC_GRACE, now)
    }
}

/// Device state as shared between the sync loop and its consumers
pub type SharedDeviceState = Arc<Mutex<DeviceState>>;

pub fn shared_device_state() -> SharedDeviceState {
    Arc::new(Mutex::new(DeviceState::new()))
}
