// src/core/engine/mod.rs

//! The instrumentation engine pieces the control core drives: the collector,
//! probe registry and performance counter configuration.

pub mod collector;
pub mod pmu;
pub mod probes;

pub use collector::{Collector, CollectorSettings, CollectorSlot, CollectorSummary};
pub use pmu::{FixedCounters, PerfEvent, PmuCtlRequest, PmuState};
pub use probes::{ProbeKey, ProbeRegistry};
