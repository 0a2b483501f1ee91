// Grid model - 2-D authoring canvas mapped onto logical output channels

pub mod mapping;

pub use mapping::{
    channel_at_position, channel_comment, describe_layout, is_channel_mapped, mapped_channels,
    position_of_channel,
};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Physical arrangement of the channels behind the authoring grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Custom,
    Matrix,
    Line,
    Circle,
}

/// Grid coordinate parsed from a `"row,col"` position key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

impl GridPosition {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Canonical `"row,col"` key form
    pub fn key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }
}

/// Parse a `"row,col"` position key. Malformed keys yield `None`, never an error.
pub fn parse_position_key(key: &str) -> Option<GridPosition> {
    let (row, col) = key.split_once(',')?;
    Some(GridPosition {
        row: row.trim().parse().ok()?,
        col: col.trim().parse().ok()?,
    })
}

/// Ordered sequence of (`"row,col"` key, optional channel) pairs.
///
/// This is the single canonical representation used internally. Deserialization
/// also accepts an associative map form and normalizes it to ordered pairs at
/// the boundary, so downstream logic never branches on representation.
/// Normalizing an already-canonical value is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChannelMapping(pub Vec<(String, Option<u16>)>);

impl<'de> Deserialize<'de> for ChannelMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Pairs(Vec<(String, Option<u16>)>),
            Keyed(BTreeMap<String, Option<u16>>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Pairs(pairs) => ChannelMapping(pairs),
            Repr::Keyed(map) => ChannelMapping(map.into_iter().collect()),
        })
    }
}

impl ChannelMapping {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u16>)> {
        self.0.iter().map(|(key, channel)| (key.as_str(), *channel))
    }

    /// Direct lookup by position key
    pub fn get(&self, key: &str) -> Option<Option<u16>> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, channel)| *channel)
    }
}

impl FromIterator<(String, Option<u16>)> for ChannelMapping {
    fn from_iter<I: IntoIterator<Item = (String, Option<u16>)>>(iter: I) -> Self {
        ChannelMapping(iter.into_iter().collect())
    }
}

/// Shape and channel mapping of the pattern-authoring canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
    pub total_channels: u16,
    pub layout_type: LayoutType,
    pub channel_mapping: ChannelMapping,
}

/// Default authoring grid: a 6x6 matrix raster-filled top-left to bottom-right
/// with channels 0..24. Cells past the channel count stay unmapped.
pub fn default_grid_config() -> GridConfig {
    raster_grid_config(6, 6, 24, LayoutType::Matrix)
}

/// Raster-fill a grid with ascending channel numbers, row-major
pub fn raster_grid_config(rows: u32, cols: u32, total_channels: u16, layout_type: LayoutType) -> GridConfig {
    let mut channel_mapping = Vec::with_capacity((rows * cols) as usize);
    let mut channel = 0u16;

    for row in 0..rows {
        for col in 0..cols {
            let mapped = if channel < total_channels {
                let c = channel;
                channel += 1;
                Some(c)
            } else {
                None
            };
            channel_mapping.push((GridPosition::new(row, col).key(), mapped));
        }
    }

    GridConfig {
        rows,
        cols,
        total_channels,
        layout_type,
        channel_mapping: ChannelMapping(channel_mapping),
    }
}

/// Grid validation failures. The mapping representation itself does not
/// enforce these invariants (it can transiently violate them during edits),
/// so callers run this before persisting a config.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridConfigError {
    #[error("Malformed position key: {0}")]
    MalformedKey(String),

    #[error("Duplicate position key: {0}")]
    DuplicateKey(String),

    #[error("Position {0} is outside the {1}x{2} grid")]
    OutOfBounds(String, u32, u32),

    #[error("Channel {0} is mapped to more than one position")]
    DuplicateChannel(u16),
}

/// Check key well-formedness, grid bounds, key uniqueness and channel uniqueness
pub fn validate_grid_config(cfg: &GridConfig) -> Result<(), GridConfigError> {
    let mut seen_keys = std::collections::HashSet::new();
    let mut seen_channels = std::collections::HashSet::new();

    for (key, channel) in cfg.channel_mapping.iter() {
        let position = parse_position_key(key)
            .ok_or_else(|| GridConfigError::MalformedKey(key.to_string()))?;
        if position.row >= cfg.rows || position.col >= cfg.cols {
            return Err(GridConfigError::OutOfBounds(
                key.to_string(),
                cfg.rows,
                cfg.cols,
            ));
        }
        if !seen_keys.insert(position.key()) {
            return Err(GridConfigError::DuplicateKey(key.to_string()));
        }
        if let Some(channel) = channel
            && !seen_channels.insert(channel)
        {
            return Err(GridConfigError::DuplicateChannel(channel));
        }
    }

    Ok(())
}
