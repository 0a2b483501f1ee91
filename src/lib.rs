// Lumatrix - Library exports for tests and the CLI

pub mod builder;
pub mod device;
pub mod grid;
pub mod patterns;
pub mod storage;
pub mod timing;

// Re-export commonly used types for convenience
pub use builder::{ConfigurationStep, PatternBuilderState, PatternMode, SaveBehaviorMode};
pub use device::api::{ApiConfig, DeviceApi, DeviceApiError, HttpDeviceApi};
pub use device::monitor::{ConnectionMonitor, ConnectionStatus};
pub use device::state::{DeviceState, FieldSource, SharedDeviceState, shared_device_state};
pub use device::sync::DeviceSyncLoop;
pub use grid::{GridConfig, GridPosition, LayoutType, default_grid_config};
pub use patterns::{LedFrame, LedPattern, PatternLibrary, PlaybackDirection};
pub use storage::{FileStore, KvStore, MemoryStore};
pub use timing::{PlaybackController, PrecisionTimer, TimerHandle, TimingAccuracy};
