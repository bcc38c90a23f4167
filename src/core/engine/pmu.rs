// src/core/engine/pmu.rs

//! Hardware performance counter configuration requested for a profile.
//!
//! This only records which counters a profile asked for; programming the
//! counters themselves belongs to the collection engine.

use crate::core::ProfCtlError;
use bitflags::bitflags;
use std::fmt;

/// Number of general purpose counters that can be programmed per core.
pub const MAX_GP_COUNTERS: usize = 8;

/// Number of fixed function counters.
pub const FIXED_COUNTER_COUNT: u8 = 3;

bitflags! {
    /// The fixed function counters, indexed 0 to 2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FixedCounters: u8 {
        const INST_RETIRED = 1 << 0;
        const CORE_CYCLES  = 1 << 1;
        const REF_CYCLES   = 1 << 2;
    }
}

impl Default for FixedCounters {
    fn default() -> Self {
        Self::empty()
    }
}

impl FixedCounters {
    pub fn from_index(index: u8) -> Result<Self, ProfCtlError> {
        if index >= FIXED_COUNTER_COUNT {
            return Err(ProfCtlError::InvalidPmuRequest(format!(
                "fixed counter index {index} out of range (0-{})",
                FIXED_COUNTER_COUNT - 1
            )));
        }
        Ok(Self::from_bits_truncate(1 << index))
    }
}

/// One general purpose counter event, as described by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfEvent {
    pub name: String,
    pub event_type: u32,
    pub config: u64,
}

/// A complete counter configuration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PmuCtlRequest {
    pub gp_events: Vec<PerfEvent>,
    pub fixed_events: Vec<u8>,
}

impl PmuCtlRequest {
    pub fn validate(&self) -> Result<FixedCounters, ProfCtlError> {
        if self.gp_events.is_empty() && self.fixed_events.is_empty() {
            return Err(ProfCtlError::InvalidPmuRequest(
                "request does not name any event".to_string(),
            ));
        }
        if self.gp_events.len() > MAX_GP_COUNTERS {
            return Err(ProfCtlError::InvalidPmuRequest(format!(
                "{} general purpose events requested, at most {MAX_GP_COUNTERS} supported",
                self.gp_events.len()
            )));
        }
        if let Some(event) = self.gp_events.iter().find(|e| e.name.trim().is_empty()) {
            return Err(ProfCtlError::InvalidPmuRequest(format!(
                "event with type {} config {:#x} has no name",
                event.event_type, event.config
            )));
        }
        self.fixed_events
            .iter()
            .try_fold(FixedCounters::empty(), |acc, index| {
                Ok(acc | FixedCounters::from_index(*index)?)
            })
    }
}

/// The counters currently requested for the process.
#[derive(Debug, Default)]
pub struct PmuState {
    gp_count: usize,
    fixed: FixedCounters,
    perf_events: Vec<PerfEvent>,
}

impl PmuState {
    pub fn enable_gp(&mut self, count: usize) -> Result<(), ProfCtlError> {
        if count > MAX_GP_COUNTERS {
            return Err(ProfCtlError::InvalidPmuRequest(format!(
                "{count} general purpose counters requested, at most {MAX_GP_COUNTERS} supported"
            )));
        }
        self.gp_count = count;
        Ok(())
    }

    pub fn enable_fixed(&mut self, index: u8) -> Result<(), ProfCtlError> {
        self.fixed |= FixedCounters::from_index(index)?;
        Ok(())
    }

    /// Applies a full request; an invalid request leaves the current state untouched.
    pub fn enable_perf_events(&mut self, request: &PmuCtlRequest) -> Result<(), ProfCtlError> {
        let fixed = request.validate()?;
        self.gp_count = request.gp_events.len();
        self.fixed |= fixed;
        self.perf_events = request.gp_events.clone();
        Ok(())
    }

    pub fn disable(&mut self) {
        *self = Self::default();
    }

    pub fn is_enabled(&self) -> bool {
        self.gp_count > 0 || !self.fixed.is_empty()
    }

    pub fn gp_count(&self) -> usize {
        self.gp_count
    }

    pub fn fixed(&self) -> FixedCounters {
        self.fixed
    }

    pub fn perf_events(&self) -> &[PerfEvent] {
        &self.perf_events
    }
}

impl fmt::Display for PmuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gp counters {}, fixed counters {:#05b}, perf events {}",
            self.gp_count,
            self.fixed.bits(),
            self.perf_events.len()
        )
    }
}
