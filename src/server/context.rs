// src/server/context.rs

use crate::config::Config;
use crate::session::SessionManager;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the host's poll loop.
pub struct ServerContext {
    pub config: Config,
    pub manager: SessionManager,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
