// src/server/initialization.rs

//! Builds the session manager from the configuration: probes, commands, the remote
//! endpoint and an optional local profile.

use super::LogReloadHandle;
use super::context::ServerContext;
use super::log_level::{SET_LOG_LEVEL_COMMAND, set_log_level_processor};
use crate::config::Config;
use crate::core::handler::BuiltinCommand;
use crate::core::profile::DEFAULT_TSC_HZ;
use crate::core::{Handler, Request};
use crate::session::SessionManager;
use anyhow::{Context, Result, anyhow};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all host components before starting the poll loop.
pub fn setup(config: Config, log_reload_handle: LogReloadHandle) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let handler = Handler::with_tsc_hz(config.tsc_hz.unwrap_or(DEFAULT_TSC_HZ));
    let mut manager = SessionManager::with_handler(handler);

    for probe in &config.probes {
        if !manager.register_probe(probe.into()) {
            warn!(
                "Probe {}@{}:{} is configured more than once.",
                probe.name, probe.file, probe.line
            );
        }
    }
    manager
        .register_command(
            SET_LOG_LEVEL_COMMAND,
            set_log_level_processor(log_reload_handle),
        )
        .context("Failed to register host commands")?;

    if config.remote.enabled {
        manager
            .enable_remote_session(config.remote.host.clone(), config.remote.port)
            .context("Failed to enable the remote session")?;
    } else {
        info!("Remote control is disabled in the configuration.");
    }

    manager.start().context("Failed to start the session manager")?;
    if config.remote.enabled {
        info!(
            "profctl listening for controllers on {}:{}",
            config.remote.host,
            manager.listener_port()
        );
    }

    if config.profile.autostart {
        autostart_profile(&mut manager, &config)?;
    }

    Ok(ServerContext {
        config,
        manager,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Begins a local profile with the configured settings.
fn autostart_profile(manager: &mut SessionManager, config: &Config) -> Result<()> {
    let settings = config.profile.collector_settings();
    let mut request = Request::new(BuiltinCommand::BeginProfile.to_string())
        .with_arg("samplesFilePattern", &settings.samples_file_pattern)
        .with_arg("pollInterval", settings.poll_interval.as_millis())
        .with_arg("samplesDataCapacity", settings.samples_data_capacity);

    if manager.execute(&mut request) {
        info!("{}", request.response().unwrap_or_default());
        Ok(())
    } else {
        Err(anyhow!(
            "Failed to autostart profile: {}",
            request.errors().unwrap_or_default()
        ))
    }
}

fn log_startup_info(config: &Config) {
    info!(
        "Profile defaults: samples file pattern '{}', poll interval {:?}, samples data capacity {} bytes ({:.2} MB).",
        config.profile.samples_file_pattern,
        config.profile.poll_interval,
        config.profile.samples_data_capacity,
        config.profile.samples_data_capacity as f64 / 1024.0 / 1024.0
    );
    info!("Host configured with {} probes.", config.probes.len());
}
