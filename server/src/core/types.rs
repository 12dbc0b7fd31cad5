// aoi_server/server/src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::AoiError;

pub type EntityId = u64;
pub type CellId = usize;

// --- Basic Geometric Types ---
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl WorldBounds {
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        WorldBounds { min_x, max_x, min_y, max_y }
    }

    pub fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64
    }

    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64
    }

    /// Half-open containment: `min <= p < max` on both axes.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (x, y) = (x as f64, y as f64);
        x >= self.min_x as f64 && x < self.max_x as f64 &&
        y >= self.min_y as f64 && y < self.max_y as f64
    }
}

impl fmt::Display for WorldBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "minX:{}, maxX:{}, minY:{}, maxY:{}", self.min_x, self.max_x, self.min_y, self.max_y)
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

/// Outcome of mapping a position onto the grid.
///
/// `clamped` is set when the position lay outside the world and was pulled onto
/// the nearest edge cell. The cell id is valid either way.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct CellResolution {
    pub cell_id: CellId,
    pub x: f32,
    pub y: f32,
    pub clamped: bool,
}

impl CellResolution {
    pub fn diagnostic(&self) -> Option<AoiError> {
        if self.clamped {
            Some(AoiError::PositionOutOfBounds { x: self.x, y: self.y, cell_id: self.cell_id })
        } else {
            None
        }
    }
}
