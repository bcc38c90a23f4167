// src/server/log_level.rs

//! A host-provided command that changes the log filter of the running process.

use super::LogReloadHandle;
use crate::core::ProfCtlError;
use crate::core::handler::CmdProcessor;
use crate::core::profile::Profile;
use crate::core::request::Arguments;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

pub const SET_LOG_LEVEL_COMMAND: &str = "setLogLevel";

/// Builds the `setLogLevel --level <filter>` processor around the reload handle.
pub fn set_log_level_processor(handle: LogReloadHandle) -> CmdProcessor {
    Box::new(
        move |_profile: &mut Profile, args: &Arguments| -> Result<String, ProfCtlError> {
            let level = args.require(SET_LOG_LEVEL_COMMAND, "level")?;
            let filter = EnvFilter::try_new(level).map_err(|_| ProfCtlError::InvalidArgument {
                arg: "level".to_string(),
                value: level.to_string(),
            })?;
            handle
                .reload(filter)
                .map_err(|e| ProfCtlError::Internal(format!("failed to reload log filter: {e}")))?;
            info!("log level set to '{}'", level);
            Ok(format!("log level set to {level}"))
        },
    )
}
