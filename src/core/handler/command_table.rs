// src/core/handler/command_table.rs

//! The table of named commands a `Handler` can execute, and the built-in commands.

use crate::core::ProfCtlError;
use crate::core::engine::{CollectorSettings, PerfEvent, PmuCtlRequest, ProbeKey};
use crate::core::profile::Profile;
use crate::core::request::Arguments;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// A command implementation: runs against the engine context and returns a payload.
pub type CmdProcessor =
    Box<dyn Fn(&mut Profile, &Arguments) -> Result<String, ProfCtlError> + Send + Sync>;

/// The commands every handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr, Display)]
#[strum(serialize_all = "camelCase")]
pub enum BuiltinCommand {
    Ping,
    TscHz,
    ListProbes,
    ActivateProbe,
    DeactivateProbe,
    EnableGpPmu,
    EnableFixedPmu,
    EnablePerfEvents,
    DisablePmu,
    BeginProfile,
    EndProfile,
    IsProfileActive,
}

type BuiltinFn = fn(&mut Profile, &Arguments) -> Result<String, ProfCtlError>;

impl BuiltinCommand {
    fn function(self) -> BuiltinFn {
        match self {
            BuiltinCommand::Ping => ping,
            BuiltinCommand::TscHz => tsc_hz,
            BuiltinCommand::ListProbes => list_probes,
            BuiltinCommand::ActivateProbe => activate_probe,
            BuiltinCommand::DeactivateProbe => deactivate_probe,
            BuiltinCommand::EnableGpPmu => enable_gp_pmu,
            BuiltinCommand::EnableFixedPmu => enable_fixed_pmu,
            BuiltinCommand::EnablePerfEvents => enable_perf_events,
            BuiltinCommand::DisablePmu => disable_pmu,
            BuiltinCommand::BeginProfile => begin_profile,
            BuiltinCommand::EndProfile => end_profile,
            BuiltinCommand::IsProfileActive => is_profile_active,
        }
    }
}

fn ping(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    Ok(profile.ping().to_string())
}

fn tsc_hz(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    Ok(profile.tsc_hz().to_string())
}

fn list_probes(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    profile.list_probes()
}

fn activate_probe(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let key = probe_key(args, "activateProbe")?;
    profile.activate_probe(&key)?;
    Ok(format!("probe {key} activated"))
}

fn deactivate_probe(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let key = probe_key(args, "deactivateProbe")?;
    profile.deactivate_probe(&key)?;
    Ok(format!("probe {key} deactivated"))
}

fn enable_gp_pmu(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let count: usize = args.parse("enableGpPmu", "count")?;
    profile.enable_gp_pmu(count)?;
    Ok(format!("{count} general purpose counters enabled"))
}

fn enable_fixed_pmu(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let index: u8 = args.parse("enableFixedPmu", "index")?;
    profile.enable_fixed_pmu(index)?;
    Ok(format!("fixed counter {index} enabled"))
}

fn enable_perf_events(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let request = pmu_request(args)?;
    profile.enable_perf_events(&request)?;
    Ok(format!("perf events enabled - {}", profile.pmu()))
}

fn disable_pmu(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    profile.disable_pmu();
    Ok("performance counters disabled".to_string())
}

fn begin_profile(profile: &mut Profile, args: &Arguments) -> Result<String, ProfCtlError> {
    let settings = CollectorSettings {
        samples_file_pattern: args
            .require("beginProfile", "samplesFilePattern")?
            .to_string(),
        poll_interval: Duration::from_millis(args.parse("beginProfile", "pollInterval")?),
        samples_data_capacity: args.parse("beginProfile", "samplesDataCapacity")?,
    };
    profile.begin(settings)
}

fn end_profile(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    Ok(profile.end())
}

fn is_profile_active(profile: &mut Profile, _: &Arguments) -> Result<String, ProfCtlError> {
    Ok(profile.is_active().to_string())
}

/// Maps command names to their processors. Names are unique.
pub struct CommandTable {
    processors: HashMap<String, CmdProcessor>,
}

impl CommandTable {
    /// Creates a table holding every `BuiltinCommand`.
    pub fn with_builtins() -> Self {
        let processors = BuiltinCommand::iter()
            .map(|command| {
                let processor: CmdProcessor = Box::new(command.function());
                (command.to_string(), processor)
            })
            .collect();
        Self { processors }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        processor: CmdProcessor,
    ) -> Result<(), ProfCtlError> {
        let name = name.into();
        if self.processors.contains_key(&name) {
            return Err(ProfCtlError::DuplicateCommand(name));
        }
        self.processors.insert(name, processor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CmdProcessor> {
        self.processors.get(name)
    }

    /// All registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.names())
            .finish()
    }
}

fn probe_key(args: &Arguments, command: &str) -> Result<ProbeKey, ProfCtlError> {
    Ok(ProbeKey::new(
        args.require(command, "file")?,
        args.parse(command, "line")?,
        args.require(command, "name")?,
    ))
}

/// Builds a `PmuCtlRequest` from `--events name:type:config[,...]` and `--fixed i[,...]`.
fn pmu_request(args: &Arguments) -> Result<PmuCtlRequest, ProfCtlError> {
    let mut request = PmuCtlRequest::default();
    if let Some(events) = args.get("events") {
        for descriptor in events.split(',').filter(|s| !s.is_empty()) {
            request.gp_events.push(parse_perf_event(descriptor)?);
        }
    }
    if let Some(fixed) = args.get("fixed") {
        for index in fixed.split(',').filter(|s| !s.is_empty()) {
            let index = index
                .parse::<u8>()
                .map_err(|_| ProfCtlError::InvalidArgument {
                    arg: "fixed".to_string(),
                    value: fixed.to_string(),
                })?;
            request.fixed_events.push(index);
        }
    }
    Ok(request)
}

fn parse_perf_event(descriptor: &str) -> Result<PerfEvent, ProfCtlError> {
    let invalid = || ProfCtlError::InvalidArgument {
        arg: "events".to_string(),
        value: descriptor.to_string(),
    };
    let mut parts = descriptor.split(':');
    let (Some(name), Some(event_type), Some(config), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    Ok(PerfEvent {
        name: name.to_string(),
        event_type: parse_number(event_type)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid)?,
        config: parse_number(config).ok_or_else(invalid)?,
    })
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_number(value: &str) -> Option<u64> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
