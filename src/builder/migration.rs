// Persisted builder-state schema and version migration

use super::defaults::default_javascript_code;
use super::{ConfigurationStep, PatternMode, SaveBehaviorMode};
use crate::grid::GridConfig;
use serde::{Deserialize, Serialize};

/// Current persisted schema version
pub const SCHEMA_VERSION: u32 = 2;

/// Allow-listed persisted subset of the builder state.
///
/// Fields added after v1 are optional so older records still deserialize;
/// migration fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBuilderState {
    pub version: u32,
    pub configuration_step: ConfigurationStep,
    pub grid_config: Option<GridConfig>,
    pub pattern_mode: PatternMode,
    pub cpp_code: String,
    #[serde(default)]
    pub javascript_code: Option<String>,
    pub expression_channel_count: u16,
    pub playback_speed: f64,
    #[serde(default)]
    pub save_behavior_mode: Option<SaveBehaviorMode>,
}

/// Migration result
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationResult {
    pub record: PersistedBuilderState,
    /// Whether any migration step ran
    pub migrated: bool,
}

/// Migrate a persisted record to the current schema version.
///
/// Pure and idempotent: records already at the current version pass through
/// untouched, and migration steps only add or repopulate fields, never remove
/// them.
pub fn migrate_to_current(mut record: PersistedBuilderState) -> MigrationResult {
    if record.version >= SCHEMA_VERSION {
        return MigrationResult {
            record,
            migrated: false,
        };
    }

    // v1 -> v2: the script program format changed, so it is repopulated from
    // the current default-code provider; the save-guard policy gets an
    // explicit value where older records had none.
    if record.version < 2 {
        record.javascript_code = Some(default_javascript_code());
        if record.save_behavior_mode.is_none() {
            record.save_behavior_mode = Some(SaveBehaviorMode::PageWide);
        }
    }

    record.version = SCHEMA_VERSION;
    MigrationResult {
        record,
        migrated: true,
    }
}
