// src/core/handler/mod.rs

//! Defines the `Handler`, the single point of truth for whether a profile is active
//! and the dispatch surface every session executes commands through.

pub mod command_table;

pub use command_table::{BuiltinCommand, CmdProcessor, CommandTable};

use crate::core::ProfCtlError;
use crate::core::engine::{CollectorSettings, PmuCtlRequest, ProbeKey};
use crate::core::metrics;
use crate::core::profile::{DEFAULT_TSC_HZ, Profile};
use crate::core::request::Request;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owns the engine context (and through it the one permitted `Collector`) together
/// with the table of named commands.
#[derive(Debug)]
pub struct Handler {
    commands: CommandTable,
    profile: Profile,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    pub fn new() -> Self {
        Self::with_tsc_hz(DEFAULT_TSC_HZ)
    }

    pub fn with_tsc_hz(tsc_hz: u64) -> Self {
        Self {
            commands: CommandTable::with_builtins(),
            profile: Profile::new(tsc_hz),
        }
    }

    /// Opens the collector. Fails without side effects if a profile is already active.
    pub fn begin_profile(
        &mut self,
        samples_file_pattern: &str,
        poll_interval: Duration,
        samples_data_capacity: u64,
    ) -> Result<String, ProfCtlError> {
        let was_active = self.is_profile_active();
        let result = self.profile.begin(CollectorSettings {
            samples_file_pattern: samples_file_pattern.to_string(),
            poll_interval,
            samples_data_capacity,
        });
        if let Err(e) = &result {
            warn!("{}", e);
        }
        self.note_profile_transition(was_active);
        result
    }

    /// Closes the collector. Safe to call without an active profile.
    pub fn end_profile(&mut self) -> String {
        let was_active = self.is_profile_active();
        let status = self.profile.end();
        self.note_profile_transition(was_active);
        status
    }

    pub fn is_profile_active(&self) -> bool {
        self.profile.is_active()
    }

    /// Makes a probe known to the handler so controllers can list and toggle it.
    pub fn register_probe(&mut self, key: ProbeKey) -> bool {
        self.profile.register_probe(key)
    }

    pub fn list_probes(&self) -> Result<String, ProfCtlError> {
        self.profile.list_probes()
    }

    pub fn activate_probe(&mut self, key: &ProbeKey) -> Result<(), ProfCtlError> {
        self.profile.activate_probe(key)
    }

    pub fn deactivate_probe(&mut self, key: &ProbeKey) -> Result<(), ProfCtlError> {
        self.profile.deactivate_probe(key)
    }

    pub fn enable_gp_pmu(&mut self, count: usize) -> Result<(), ProfCtlError> {
        self.profile.enable_gp_pmu(count)
    }

    pub fn enable_fixed_pmu(&mut self, index: u8) -> Result<(), ProfCtlError> {
        self.profile.enable_fixed_pmu(index)
    }

    pub fn enable_perf_events(&mut self, request: &PmuCtlRequest) -> bool {
        match self.profile.enable_perf_events(request) {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to enable perf events: {}", e);
                false
            }
        }
    }

    pub fn disable_pmu(&mut self) {
        self.profile.disable_pmu();
    }

    /// Advances the active collector's periodic bookkeeping.
    pub fn poll(&mut self) {
        self.profile.poll();
    }

    /// Tears down any active profile. Idempotent.
    pub fn shutdown(&mut self) {
        if self.is_profile_active() {
            info!("handler shutdown - ending active profile");
        }
        self.end_profile();
    }

    pub fn ping(&self) -> &'static str {
        self.profile.ping()
    }

    pub fn tsc_hz(&self) -> u64 {
        self.profile.tsc_hz()
    }

    /// The poll interval of the most recently started profile.
    pub fn poll_interval(&self) -> Duration {
        self.profile.poll_interval()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Adds a command to the table. Names must be unique.
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        processor: CmdProcessor,
    ) -> Result<(), ProfCtlError> {
        self.commands.register(name, processor)
    }

    /// Runs a request through the command table and stores its outcome.
    /// Requests that already carry an outcome (e.g. parse failures) are left untouched.
    /// Returns true if the request succeeded.
    pub fn execute(&mut self, request: &mut Request) -> bool {
        if !request.is_complete() {
            let was_active = self.is_profile_active();
            let result = match self.commands.get(request.command()) {
                Some(processor) => processor(&mut self.profile, request.args()),
                None => Err(ProfCtlError::UnknownCommand(request.command().to_string())),
            };
            debug!("executed '{}' -> {:?}", request, result);
            request.complete(result);
            self.note_profile_transition(was_active);
        }

        let succeeded = request.response().is_some();
        if !succeeded {
            metrics::REQUESTS_FAILED_TOTAL.inc();
        }
        succeeded
    }

    fn note_profile_transition(&self, was_active: bool) {
        let is_active = self.is_profile_active();
        if is_active && !was_active {
            metrics::PROFILES_STARTED_TOTAL.inc();
        }
        metrics::PROFILE_ACTIVE.set(if is_active { 1.0 } else { 0.0 });
    }
}
