// Device-facing side of the engine: query/command API, shared state with
// writer provenance, the polling sync loop and the connection monitor

pub mod api;
pub mod monitor;
pub mod state;
pub mod sync;

pub use api::{ApiConfig, DeviceApi, DeviceApiError, HttpDeviceApi};
pub use monitor::{ConnectionMonitor, ConnectionStatus};
pub use state::{DeviceState, FieldSource, SharedDeviceState, SyncedField, shared_device_state};
pub use sync::DeviceSyncLoop;
