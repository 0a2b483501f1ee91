// Pattern builder state - versioned, persisted authoring configuration

pub mod defaults;
pub mod migration;

pub use defaults::{default_cpp_code, default_javascript_code};
pub use migration::{MigrationResult, PersistedBuilderState, SCHEMA_VERSION, migrate_to_current};

use crate::grid::{GridConfig, default_grid_config};
use crate::storage::KvStore;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Fixed persistence key for the builder record
pub const BUILDER_STORAGE_KEY: &str = "pattern-builder-storage";

/// Wizard position. Purely advisory - any step can be set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationStep {
    Grid,
    Mapping,
    Pattern,
}

/// Which authoring surface is authoritative for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    Visual,
    Cpp,
    Expression,
    Javascript,
}

/// Save-guard policy for unsaved editor changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveBehaviorMode {
    #[serde(rename = "browser-default")]
    BrowserDefault,
    #[serde(rename = "editor-only")]
    EditorOnly,
    #[serde(rename = "page-wide")]
    PageWide,
}

/// Authoring configuration for the pattern builder.
///
/// One instance per application session; persisted across restarts through a
/// [`KvStore`] under [`BUILDER_STORAGE_KEY`]. All setters are total - a bad
/// value can never make a setter fail.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternBuilderState {
    pub configuration_step: ConfigurationStep,
    pub grid_config: Option<GridConfig>,
    pub pattern_mode: PatternMode,
    pub cpp_code: String,
    pub javascript_code: String,
    pub expression_channel_count: u16,
    /// Playback speed multiplier, expected > 0
    pub playback_speed: f64,
    pub save_behavior_mode: SaveBehaviorMode,
}

impl Default for PatternBuilderState {
    /// The fixed initial snapshot `reset()` restores
    fn default() -> Self {
        Self {
            configuration_step: ConfigurationStep::Pattern,
            grid_config: Some(default_grid_config()),
            pattern_mode: PatternMode::Javascript,
            cpp_code: default_cpp_code(),
            javascript_code: default_javascript_code(),
            expression_channel_count: 24,
            playback_speed: 1.0,
            save_behavior_mode: SaveBehaviorMode::PageWide,
        }
    }
}

impl PatternBuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_configuration_step(&mut self, step: ConfigurationStep) {
        self.configuration_step = step;
    }

    /// Store a grid config. The canonical ordered-pairs mapping representation
    /// is guaranteed by the [`crate::grid::ChannelMapping`] type itself - an
    /// associative form is normalized during deserialization, so the value
    /// arriving here is already canonical.
    pub fn set_grid_config(&mut self, config: GridConfig) {
        self.grid_config = Some(config);
    }

    pub fn set_pattern_mode(&mut self, mode: PatternMode) {
        self.pattern_mode = mode;
    }

    pub fn set_cpp_code(&mut self, code: String) {
        self.cpp_code = code;
    }

    pub fn set_javascript_code(&mut self, code: String) {
        self.javascript_code = code;
    }

    pub fn set_expression_channel_count(&mut self, count: u16) {
        self.expression_channel_count = count;
    }

    pub fn set_playback_speed(&mut self, speed: f64) {
        self.playback_speed = speed;
    }

    pub fn set_save_behavior_mode(&mut self, mode: SaveBehaviorMode) {
        self.save_behavior_mode = mode;
    }

    /// Restore the entire record to the fixed initial snapshot
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Allow-listed persisted projection of this state
    pub fn to_persisted(&self) -> PersistedBuilderState {
        PersistedBuilderState {
            version: SCHEMA_VERSION,
            configuration_step: self.configuration_step,
            grid_config: self.grid_config.clone(),
            pattern_mode: self.pattern_mode,
            cpp_code: self.cpp_code.clone(),
            javascript_code: Some(self.javascript_code.clone()),
            expression_channel_count: self.expression_channel_count,
            playback_speed: self.playback_speed,
            save_behavior_mode: Some(self.save_behavior_mode),
        }
    }

    fn from_persisted(record: PersistedBuilderState) -> Self {
        Self {
            configuration_step: record.configuration_step,
            grid_config: record.grid_config,
            pattern_mode: record.pattern_mode,
            cpp_code: record.cpp_code,
            javascript_code: record
                .javascript_code
                .unwrap_or_else(default_javascript_code),
            expression_channel_count: record.expression_channel_count,
            playback_speed: record.playback_speed,
            save_behavior_mode: record
                .save_behavior_mode
                .unwrap_or(SaveBehaviorMode::PageWide),
        }
    }

    /// Persist the allow-listed subset under the fixed storage key
    pub fn save(&self, store: &mut impl KvStore) {
        match serde_json::to_string(&self.to_persisted()) {
            Ok(json) => store.set(BUILDER_STORAGE_KEY, json),
            Err(e) => warn!("Failed to serialize builder state: {}", e),
        }
    }

    /// Load from storage, migrating older schema versions once.
    ///
    /// A missing or malformed record yields the default snapshot - loading
    /// never fails.
    pub fn load(store: &impl KvStore) -> Self {
        let Some(raw) = store.get(BUILDER_STORAGE_KEY) else {
            return Self::default();
        };

        match serde_json::from_str::<PersistedBuilderState>(&raw) {
            Ok(record) => {
                let MigrationResult { record, migrated } = migrate_to_current(record);
                if migrated {
                    debug!("Migrated builder state to schema v{}", record.version);
                }
                Self::from_persisted(record)
            }
            Err(e) => {
                warn!("Discarding malformed builder state: {}", e);
                Self::default()
            }
        }
    }
}
