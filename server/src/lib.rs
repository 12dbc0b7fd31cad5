// aoi_server/server/src/lib.rs

pub mod core;
pub mod concurrent;
pub mod entities;
pub mod world;
pub mod network;
pub mod operational;

pub use crate::concurrent::spatial_index::{GridIndex, GridIndexStats};
pub use crate::core::error::{AoiError, AoiResult};
pub use crate::core::types::{CellId, CellResolution, EntityId, WorldBounds};
pub use crate::world::cell::Cell;
