// Playback controller - start/stop semantics layered over the precision timer

use super::timer::{PrecisionTimer, TimerHandle, TimingAccuracy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Minimum per-frame delay, so a zero-delay frame can never turn into a tight loop
const MIN_FRAME_DELAY_MS: f64 = 1.0;

/// Sequences per-frame effects for a presentation layer.
///
/// A frame callback scheduled while playing is suppressed if playback stops
/// before it fires: the playing flag is checked again at fire time, not just
/// at schedule time.
pub struct PlaybackController {
    timer: PrecisionTimer,
    playing: Arc<AtomicBool>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            timer: PrecisionTimer::new(),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn start_playback(&mut self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    /// Stop playback and cancel any in-flight frame callback
    pub fn stop_playback(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
        self.timer.clear();
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Schedule the next frame's completion callback.
    ///
    /// Returns an inert handle when not playing. The delay is clamped to at
    /// least [`MIN_FRAME_DELAY_MS`].
    pub fn schedule_frame(
        &mut self,
        delay_ms: f64,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> TimerHandle {
        if !self.is_playing() {
            return TimerHandle::inert();
        }

        let playing = Arc::clone(&self.playing);
        self.timer
            .schedule_callback(delay_ms.max(MIN_FRAME_DELAY_MS), move || {
                if playing.load(Ordering::SeqCst) {
                    on_complete();
                }
            })
    }

    /// Timing diagnostics for the last completed frame
    pub fn timing_accuracy(&self) -> TimingAccuracy {
        self.timer.timing_accuracy()
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        // Release the timer regardless of play state
        self.stop_playback();
    }
}
