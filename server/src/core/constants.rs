// aoi_server/server/src/core/constants.rs
use std::time::Duration;

pub const SERVER_TICK_RATE: u64 = 20;
pub const TICK_DURATION_MS: u64 = 1000 / SERVER_TICK_RATE;
pub const TICK_DURATION: Duration = Duration::from_millis(TICK_DURATION_MS);
pub const MAX_TICK_RATE: u64 = 1000;
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

// World constants
pub const WORLD_MIN_X: i32 = 0;
pub const WORLD_MAX_X: i32 = 250;
pub const WORLD_MIN_Y: i32 = 0;
pub const WORLD_MAX_Y: i32 = 250;
pub const GRID_COLUMN_COUNT: usize = 5;
pub const GRID_ROW_COUNT: usize = 5;

// Spawn area on the (x, z) plane
pub const SPAWN_ORIGIN_X: f32 = 160.0;
pub const SPAWN_SPREAD_X: u32 = 10;
pub const SPAWN_ORIGIN_Z: f32 = 134.0;
pub const SPAWN_SPREAD_Z: u32 = 17;

// Message ids
pub const MSG_SYNC_PID: u32 = 1;
pub const MSG_BROADCAST: u32 = 200;

// Demo loop
pub const DEMO_PLAYER_COUNT: usize = 32;
pub const DEMO_TICK_COUNT: u64 = 200;
pub const DEMO_MAX_STEP: f32 = 6.0;
