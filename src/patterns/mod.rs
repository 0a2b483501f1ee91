// User-authored pattern records: frames of channel states with per-frame delays

pub mod library;

pub use library::{ImportOutcome, PatternImportError, PatternLibrary};

use crate::grid::GridConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delay applied to frames that do not specify one
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

fn default_frame_delay() -> u32 {
    DEFAULT_FRAME_DELAY_MS
}

/// One playback step: the on/off state of every channel plus how long to hold it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedFrame {
    pub id: String,
    pub channels: Vec<bool>,
    #[serde(default = "default_frame_delay")]
    pub delay_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LedFrame {
    /// All-off frame for the given channel count
    pub fn empty(total_channels: u16) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channels: vec![false; total_channels as usize],
            delay_ms: DEFAULT_FRAME_DELAY_MS,
            label: None,
        }
    }
}

/// Traversal order over a pattern's frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackDirection {
    #[default]
    Forward,
    Reverse,
    Alternate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSettings {
    pub default_delay_ms: u32,
    pub total_channels: u16,
    pub repeat_count: u32,
    pub direction: PlaybackDirection,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            default_delay_ms: DEFAULT_FRAME_DELAY_MS,
            total_channels: 24,
            repeat_count: 1,
            direction: PlaybackDirection::Forward,
        }
    }
}

/// A named, user-authored light pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedPattern {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub frames: Vec<LedFrame>,
    #[serde(default)]
    pub settings: PatternSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_config: Option<GridConfig>,
}

impl LedPattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            frames: Vec::new(),
            settings: PatternSettings::default(),
            grid_config: None,
        }
    }

    /// Pattern seeded with a single all-off frame
    pub fn with_default_frame(name: impl Into<String>, total_channels: u16) -> Self {
        let mut pattern = Self::new(name);
        pattern.settings.total_channels = total_channels;
        pattern.frames.push(LedFrame::empty(total_channels));
        pattern
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Wall-clock duration of one pass at the given speed multiplier
    pub fn playback_duration_ms(&self, speed: f64) -> f64 {
        let total: u64 = self.frames.iter().map(|frame| frame.delay_ms as u64).sum();
        if speed > 0.0 {
            total as f64 / speed
        } else {
            total as f64
        }
    }
}
