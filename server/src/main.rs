// aoi_server/server/src/main.rs
use aoi_server_core::core::config::AoiConfig;
use aoi_server_core::core::constants::DEMO_MAX_STEP;
use aoi_server_core::core::types::EntityId;
use aoi_server_core::entities::player::{PlayerIdGenerator, PlayerManager};
use aoi_server_core::network::connection::{Connection, QueuedConnection};
use aoi_server_core::operational::monitoring::metrics::{init_logging, MetricsSystem};

use anyhow::Context;
use rand::Rng;
use rayon::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

fn load_config() -> anyhow::Result<AoiConfig> {
    match std::env::var("AOI_CONFIG") {
        Ok(path) => AoiConfig::load(&path).with_context(|| format!("Failed to load config from {}", path)),
        Err(_) => Ok(AoiConfig::default()),
    }
}

/// Random walk step for one player, kept inside the world. Returns 1 when the
/// player crossed into another cell.
fn step_player(manager: &PlayerManager, player_id: EntityId) -> usize {
    let Some(player) = manager.get_player(player_id) else {
        return 0;
    };
    let world = manager.grid().world_bounds();
    let mut rng = rand::thread_rng();

    let x = (player.x + rng.gen_range(-DEMO_MAX_STEP..=DEMO_MAX_STEP))
        .clamp(world.min_x as f32, world.max_x as f32 - 1.0);
    let z = (player.z + rng.gen_range(-DEMO_MAX_STEP..=DEMO_MAX_STEP))
        .clamp(world.min_y as f32, world.max_y as f32 - 1.0);
    let rotation = (player.rotation + rng.gen_range(-15.0f32..15.0)).rem_euclid(360.0);

    match manager.update_player_position(player_id, x, player.y, z, rotation) {
        Ok(Some(true)) => 1,
        Ok(_) => 0,
        Err(e) => {
            warn!("Failed to move player {}: {}", player_id, e);
            0
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    info!("AOI server starting up...");

    let grid = Arc::new(config.build_grid().context("Failed to build AOI grid")?);
    info!(
        "AOI grid ready: {}x{} cells of {}x{} over world ({})",
        grid.column_count(),
        grid.row_count(),
        grid.cell_width(),
        grid.cell_height(),
        grid.world_bounds()
    );

    let metrics = match config.metrics_listen_addr {
        Some(addr) => {
            let system = MetricsSystem::install(addr)?;
            info!("Prometheus metrics listening on http://{}/metrics", addr);
            Some(system)
        }
        None => None,
    };

    let manager = Arc::new(PlayerManager::new(grid.clone(), Arc::new(PlayerIdGenerator::new())));
    let mut connections = Vec::with_capacity(config.demo.player_count);
    {
        let mut rng = rand::thread_rng();
        for i in 0..config.demo.player_count {
            let remote = SocketAddr::from(([127, 0, 0, 1], 20000u16.wrapping_add(i as u16)));
            let conn = Arc::new(QueuedConnection::new(i as u32, remote));
            conn.start();
            manager.add_player(Some(conn.clone() as Arc<dyn Connection>), &mut rng)?;
            connections.push(conn);
        }
    }
    info!("{} players spawned.", manager.player_count());

    let tick_rate = config.demo.tick_rate.max(1);
    let mut ticker = interval(config.demo.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for tick in 0..config.demo.tick_count {
        ticker.tick().await;

        let player_ids = manager.player_ids();
        let crossings: usize = player_ids.par_iter().map(|&id| step_player(&manager, id)).sum();
        let delivered: usize = player_ids
            .par_iter()
            .map(|&id| match manager.broadcast_position(id) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Broadcast for player {} failed: {}", id, e);
                    0
                }
            })
            .sum();
        // Nobody reads the queued connections; discard what was sent this tick.
        for conn in &connections {
            conn.drain_outbound();
        }

        if tick % tick_rate == 0 {
            let stats = grid.stats();
            info!(
                "Tick {}: {} cell crossings, {} broadcasts, {}/{} cells occupied, max {} per cell",
                tick, crossings, delivered, stats.occupied_cells, stats.total_cells, stats.max_entities_per_cell
            );
            if let Some(metrics) = &metrics {
                metrics.update_player_count(manager.player_count());
                metrics.record_grid_stats(&stats);
            }
        }
    }

    for player_id in manager.player_ids() {
        manager.remove_player(player_id)?;
    }
    info!("AOI server shut down. Final grid stats: {:?}", grid.stats());
    Ok(())
}
