// src/core/profile.rs

//! The engine context every command runs against.
//!
//! `Profile` owns the collector slot, the probe registry and the counter configuration,
//! and remembers which probes were switched on since the last profile ended so that
//! ending a profile always leaves the engine in a clean state.

use crate::core::ProfCtlError;
use crate::core::engine::{
    Collector, CollectorSettings, CollectorSlot, PmuCtlRequest, PmuState, ProbeKey, ProbeRegistry,
};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Poll interval used until a profile configures its own.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timestamps come from the monotonic nanosecond clock unless a TSC rate is configured.
pub const DEFAULT_TSC_HZ: u64 = 1_000_000_000;

pub const PING_REPLY: &str = "pong";

#[derive(Debug)]
pub struct Profile {
    collector: CollectorSlot,
    probes: ProbeRegistry,
    pmu: PmuState,
    session_probes: BTreeSet<ProbeKey>,
    poll_interval: Duration,
    tsc_hz: u64,
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(DEFAULT_TSC_HZ)
    }
}

impl Profile {
    pub fn new(tsc_hz: u64) -> Self {
        Self {
            collector: CollectorSlot::new(),
            probes: ProbeRegistry::new(),
            pmu: PmuState::default(),
            session_probes: BTreeSet::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tsc_hz,
        }
    }

    /// Opens the collector and adopts its poll interval.
    pub fn begin(&mut self, settings: CollectorSettings) -> Result<String, ProfCtlError> {
        let poll_interval = settings.poll_interval;
        let collector = self.collector.open(settings)?;
        let status = format!(
            "profile started - samples file {}, poll interval {} ms, samples data capacity {} bytes",
            collector.samples_file(),
            poll_interval.as_millis(),
            collector.settings().samples_data_capacity
        );
        self.poll_interval = poll_interval;
        info!("{}", status);
        Ok(status)
    }

    /// Closes the collector, if any, and reverts probe and counter changes made since
    /// the previous end.
    pub fn end(&mut self) -> String {
        let summary = self.collector.close();
        let reverted = self.revert_session_changes();
        match summary {
            Some(summary) => {
                let status = format!("profile ended - {summary}, {reverted} probes reverted");
                info!("{}", status);
                status
            }
            None => {
                debug!("end requested without an active profile ({reverted} probes reverted)");
                "no active profile to end".to_string()
            }
        }
    }

    fn revert_session_changes(&mut self) -> usize {
        let mut reverted = 0;
        for key in std::mem::take(&mut self.session_probes) {
            if let Ok(true) = self.probes.deactivate(&key) {
                reverted += 1;
            }
        }
        if self.pmu.is_enabled() {
            debug!("disabling performance counters ({})", self.pmu);
            self.pmu.disable();
        }
        reverted
    }

    pub fn is_active(&self) -> bool {
        self.collector.is_occupied()
    }

    pub fn poll(&mut self) {
        self.collector.poll();
    }

    pub fn register_probe(&mut self, key: ProbeKey) -> bool {
        self.probes.register(key)
    }

    pub fn list_probes(&self) -> Result<String, ProfCtlError> {
        self.probes.to_json()
    }

    pub fn activate_probe(&mut self, key: &ProbeKey) -> Result<(), ProfCtlError> {
        if self.probes.activate(key)? {
            debug!("activated probe {}", key);
            self.session_probes.insert(key.clone());
        }
        Ok(())
    }

    pub fn deactivate_probe(&mut self, key: &ProbeKey) -> Result<(), ProfCtlError> {
        if self.probes.deactivate(key)? {
            debug!("deactivated probe {}", key);
        }
        self.session_probes.remove(key);
        Ok(())
    }

    pub fn enable_gp_pmu(&mut self, count: usize) -> Result<(), ProfCtlError> {
        self.pmu.enable_gp(count)
    }

    pub fn enable_fixed_pmu(&mut self, index: u8) -> Result<(), ProfCtlError> {
        self.pmu.enable_fixed(index)
    }

    pub fn enable_perf_events(&mut self, request: &PmuCtlRequest) -> Result<(), ProfCtlError> {
        self.pmu.enable_perf_events(request)
    }

    pub fn disable_pmu(&mut self) {
        self.pmu.disable();
    }

    pub fn ping(&self) -> &'static str {
        PING_REPLY
    }

    pub fn tsc_hz(&self) -> u64 {
        self.tsc_hz
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn collector(&self) -> Option<&Collector> {
        self.collector.get()
    }

    pub fn probes(&self) -> &ProbeRegistry {
        &self.probes
    }

    pub fn pmu(&self) -> &PmuState {
        &self.pmu
    }
}
