// Precision scheduling for frame-accurate pattern playback

pub mod playback;
pub mod timer;

pub use playback::PlaybackController;
pub use timer::{PrecisionTimer, TimerHandle, TimingAccuracy};
