// src/server/spawner.rs

//! Spawns the host's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use tracing::info;

pub fn spawn_all(ctx: &mut ServerContext) {
    // --- Metrics Server ---
    if ctx.config.metrics.enabled {
        let port = ctx.config.metrics.port;
        let shutdown_rx_metrics = ctx.shutdown_tx.subscribe();
        ctx.background_tasks.spawn(async move {
            metrics_server::run_metrics_server(port, shutdown_rx_metrics).await
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }
}
