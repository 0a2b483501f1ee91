// Pure grid <-> channel lookup utilities

use super::{GridConfig, GridPosition, LayoutType, parse_position_key};

/// First grid position mapped to `channel`, scanning the mapping in order.
///
/// Channel uniqueness is not structurally enforced, so first-match wins if
/// duplicates exist.
pub fn position_of_channel(channel: u16, cfg: &GridConfig) -> Option<GridPosition> {
    cfg.channel_mapping
        .iter()
        .find(|(_, mapped)| *mapped == Some(channel))
        .and_then(|(key, _)| parse_position_key(key))
}

/// Channel driven by the cell at (`row`, `col`), if any
pub fn channel_at_position(row: u32, col: u32, cfg: &GridConfig) -> Option<u16> {
    cfg.channel_mapping
        .get(&GridPosition::new(row, col).key())
        .flatten()
}

/// Ascending, distinct channel numbers actually used by the mapping
pub fn mapped_channels(cfg: &GridConfig) -> Vec<u16> {
    let mut channels: Vec<u16> = cfg
        .channel_mapping
        .iter()
        .filter_map(|(_, channel)| channel)
        .collect();
    channels.sort_unstable();
    channels.dedup();
    channels
}

pub fn is_channel_mapped(channel: u16, cfg: &GridConfig) -> bool {
    position_of_channel(channel, cfg).is_some()
}

/// Human-readable description of the configured layout
pub fn describe_layout(cfg: &GridConfig) -> String {
    match cfg.layout_type {
        LayoutType::Matrix => format!(
            "{}x{} Matrix Layout ({} channels)",
            cfg.rows, cfg.cols, cfg.total_channels
        ),
        LayoutType::Line => format!("Linear Layout ({} channels in line)", cfg.total_channels),
        LayoutType::Circle => format!(
            "Circular Layout ({} channels in circle)",
            cfg.total_channels
        ),
        LayoutType::Custom => format!("Custom Layout ({} channels)", cfg.total_channels),
    }
}

/// Label for a channel, with its grid position when mapped
pub fn channel_comment(channel: u16, cfg: &GridConfig) -> String {
    match position_of_channel(channel, cfg) {
        Some(position) => format!("Channel {} at [{},{}]", channel, position.row, position.col),
        None => format!("Channel {}", channel),
    }
}
