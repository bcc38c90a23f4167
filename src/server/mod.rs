// src/server/mod.rs

//! The host process: builds the session manager from the configuration and drives it
//! until the process is asked to stop.

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, reload};

mod context;
mod initialization;
mod log_level;
mod metrics_server;
mod poll_loop;
mod spawner;

pub use log_level::SET_LOG_LEVEL_COMMAND;

/// The handle used to change the log filter while the host is running.
pub type LogReloadHandle = Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>;

/// The main host startup function, orchestrating all setup phases.
pub async fn run(config: Config, log_reload_handle: LogReloadHandle) -> Result<()> {
    // 1. Build and start the session manager.
    let mut server_context = initialization::setup(config, log_reload_handle)?;

    // 2. Spawn the background tasks.
    spawner::spawn_all(&mut server_context);

    // 3. Drive the manager until a shutdown signal arrives.
    poll_loop::run(server_context).await
}
