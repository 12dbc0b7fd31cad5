// aoi_server/server/src/world/mod.rs
pub mod cell;
