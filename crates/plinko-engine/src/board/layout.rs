use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::error::ConfigError;
use crate::api::types::BoardConfig;
use crate::board::multipliers::MultiplierTable;

/// Fixed board geometry in world units (Y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDimensions {
    pub width: f32,
    pub height: f32,
    /// Gap above the first peg row (the ball spawns inside it).
    pub top_margin: f32,
    pub bottom_margin: f32,
    pub bucket_height: f32,
}

impl BoardDimensions {
    /// Height available to the peg rows.
    pub fn peg_area_height(&self) -> f32 {
        self.height - self.top_margin - self.bottom_margin - self.bucket_height
    }
}

impl Default for BoardDimensions {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 650.0,
            top_margin: 80.0,
            bottom_margin: 20.0,
            bucket_height: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PegPosition {
    pub x: f32,
    pub y: f32,
}

impl PegPosition {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A scoring bucket. `(x, y)` is the center of its top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSlot {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub multiplier: f64,
}

impl BucketSlot {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Static geometry of one board: a triangular peg field over a row of buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub config: BoardConfig,
    pub dimensions: BoardDimensions,
    /// Row-major, top row first, left to right.
    pub pegs: Vec<PegPosition>,
    /// Left to right; `buckets[i].index == i`.
    pub buckets: Vec<BucketSlot>,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    /// Y of the top edge of the bucket row.
    pub bucket_y: f32,
}

impl BoardLayout {
    pub fn bucket(&self, index: usize) -> Option<&BucketSlot> {
        self.buckets.get(index)
    }

    /// Buckets tile the full board width, so a bucket is one spacing wide.
    pub fn bucket_width(&self) -> f32 {
        self.horizontal_spacing
    }

    /// X coordinates of the bucket boundaries, including both outer edges.
    pub fn bucket_boundaries(&self) -> impl Iterator<Item = f32> + '_ {
        let start = self.buckets.first().map_or(0.0, |b| b.x - self.horizontal_spacing / 2.0);
        (0..=self.buckets.len()).map(move |i| start + i as f32 * self.horizontal_spacing)
    }
}

/// Compute the board geometry for `config`.
///
/// Row `i` holds `i + 2` pegs spaced `width / (rows + 1)` apart and centered
/// horizontally; rows split the peg area evenly. The `rows + 1` buckets sit
/// directly under the last row, centered under its span. Pure: identical
/// input always yields identical output.
pub fn generate_layout(
    config: BoardConfig,
    table: &MultiplierTable,
    dims: &BoardDimensions,
) -> Result<BoardLayout, ConfigError> {
    if config.rows == 0 {
        return Err(ConfigError::UnsupportedBoard {
            risk: config.risk,
            rows: config.rows,
        });
    }
    let multipliers = table.sequence(&config)?;

    let rows = config.rows as usize;
    let peg_area_height = dims.peg_area_height();
    let vertical_spacing = peg_area_height / rows as f32;
    let horizontal_spacing = dims.width / (rows + 1) as f32;

    let mut pegs = Vec::with_capacity((0..rows).map(|i| i + 2).sum());
    for i in 0..rows {
        let pegs_in_row = i + 2;
        let row_y = dims.top_margin + i as f32 * vertical_spacing;
        let row_start_x = (dims.width - (pegs_in_row - 1) as f32 * horizontal_spacing) / 2.0;
        for j in 0..pegs_in_row {
            pegs.push(PegPosition {
                x: row_start_x + j as f32 * horizontal_spacing,
                y: row_y,
            });
        }
    }

    let bucket_y = dims.top_margin + peg_area_height;
    let bucket_start_x = (dims.width - multipliers.len() as f32 * horizontal_spacing) / 2.0
        + horizontal_spacing / 2.0;
    let buckets = multipliers
        .iter()
        .enumerate()
        .map(|(index, &multiplier)| BucketSlot {
            index,
            x: bucket_start_x + index as f32 * horizontal_spacing,
            y: bucket_y,
            multiplier,
        })
        .collect();

    Ok(BoardLayout {
        config,
        dimensions: *dims,
        pegs,
        buckets,
        horizontal_spacing,
        vertical_spacing,
        bucket_y,
    })
}
