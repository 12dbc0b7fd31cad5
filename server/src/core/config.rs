// aoi_server/server/src/core/config.rs
use crate::concurrent::spatial_index::GridIndex;
use crate::core::constants::*;
use crate::core::error::{AoiError, AoiResult};
use crate::core::types::WorldBounds;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "aoi_server_core=info,warn".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub player_count: usize,
    pub tick_count: u64,
    pub tick_rate: u64,
}

impl DemoConfig {
    /// Tick period for `tick_rate`; never shorter than 1ms.
    pub fn tick_period(&self) -> Duration {
        if self.tick_rate == 0 {
            return TICK_DURATION;
        }
        Duration::from_secs_f64(1.0 / self.tick_rate as f64).max(MIN_TICK_PERIOD)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            player_count: DEMO_PLAYER_COUNT,
            tick_count: DEMO_TICK_COUNT,
            tick_rate: SERVER_TICK_RATE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    pub world: WorldBounds,
    pub column_count: usize,
    pub row_count: usize,
    pub logging: LoggingConfig,
    pub metrics_listen_addr: Option<SocketAddr>,
    pub demo: DemoConfig,
}

impl Default for AoiConfig {
    fn default() -> Self {
        AoiConfig {
            world: WorldBounds::new(WORLD_MIN_X, WORLD_MAX_X, WORLD_MIN_Y, WORLD_MAX_Y),
            column_count: GRID_COLUMN_COUNT,
            row_count: GRID_ROW_COUNT,
            logging: LoggingConfig::default(),
            metrics_listen_addr: None,
            demo: DemoConfig::default(),
        }
    }
}

impl AoiConfig {
    pub fn from_yaml_str(yaml: &str) -> AoiResult<Self> {
        let config: AoiConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AoiResult<()> {
        if self.demo.tick_rate == 0 || self.demo.tick_rate > MAX_TICK_RATE {
            return Err(AoiError::InvalidConfiguration(format!(
                "demo tick_rate must be within 1..={}, got {}",
                MAX_TICK_RATE, self.demo.tick_rate
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> AoiResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn build_grid(&self) -> AoiResult<GridIndex> {
        GridIndex::create(self.world, self.column_count, self.row_count)
    }
}
