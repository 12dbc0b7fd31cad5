// aoi_server/server/src/operational/monitoring/metrics.rs
use crate::concurrent::spatial_index::GridIndexStats;
use crate::core::config::LoggingConfig;
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use anyhow::{Context, Result};

pub struct MetricsSystem {
    start_time: Instant,
}

impl MetricsSystem {
    pub fn install(listen_addr: SocketAddr) -> Result<Self> {
        PrometheusBuilder::new()
            .with_http_listener(listen_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;

        describe_counter!("aoi_entities_added_total", "Entities inserted into a grid cell");
        describe_counter!("aoi_entities_removed_total", "Entities removed from a grid cell");
        describe_counter!("aoi_position_out_of_bounds_total", "Positions clamped onto the grid edge");
        describe_counter!("aoi_unknown_cell_total", "Operations rejected for an unknown cell id");
        describe_counter!("aoi_near_queries_total", "Nine-block neighbourhood queries");
        describe_histogram!("aoi_near_query_result_size", "Entities returned per neighbourhood query");
        describe_gauge!("aoi_players_connected", "Number of players in the world");
        describe_gauge!("aoi_occupied_cells", "Cells holding at least one entity");
        describe_gauge!("aoi_max_entities_per_cell", "Largest cell population");
        describe_gauge!("aoi_uptime_seconds", "Seconds since metrics were installed");

        Ok(MetricsSystem {
            start_time: Instant::now(),
        })
    }

    pub fn update_player_count(&self, count: usize) {
        gauge!("aoi_players_connected").set(count as f64);
    }

    pub fn record_grid_stats(&self, stats: &GridIndexStats) {
        gauge!("aoi_occupied_cells").set(stats.occupied_cells as f64);
        gauge!("aoi_max_entities_per_cell").set(stats.max_entities_per_cell as f64);
        gauge!("aoi_uptime_seconds").set(self.start_time.elapsed().as_secs_f64());
    }
}

// Logging setup
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let initialized = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    initialized.context("Failed to initialize tracing subscriber")?;

    Ok(())
}
