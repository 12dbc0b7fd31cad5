// aoi_server/server/src/core/error.rs
use crate::core::types::CellId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AoiError {
    #[error("Invalid grid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Position ({x}, {y}) is outside the world, clamped to cell {cell_id}")]
    PositionOutOfBounds { x: f32, y: f32, cell_id: CellId },

    #[error("Cell id out of range: grid has {column_count} columns and {row_count} rows")]
    CellIdOutOfRange { column_count: usize, row_count: usize },

    #[error("Unknown cell id: {0}")]
    UnknownCellId(CellId),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AoiResult<T> = Result<T, AoiError>;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Connection is closed")]
    Closed,

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;
