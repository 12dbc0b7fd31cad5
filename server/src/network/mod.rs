// aoi_server/server/src/network/mod.rs
pub mod connection;
