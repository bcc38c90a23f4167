// src/core/engine/collector.rs

//! The collector handle and the slot that guarantees at most one exists.

use crate::core::ProfCtlError;
use chrono::Local;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::trace;

/// Upper bound for the per-thread sample buffer capacity.
pub const MAX_SAMPLES_DATA_CAPACITY: u64 = 1024 * 1024 * 1024;

/// Everything needed to open a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSettings {
    /// Sample file naming pattern; the first `*` is replaced by `<pid>-<timestamp>`.
    pub samples_file_pattern: String,
    pub poll_interval: Duration,
    pub samples_data_capacity: u64,
}

impl CollectorSettings {
    pub fn validate(&self) -> Result<(), ProfCtlError> {
        if self.samples_file_pattern.trim().is_empty() {
            return Err(ProfCtlError::InvalidProfile(
                "samples file pattern cannot be empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ProfCtlError::InvalidProfile(
                "poll interval cannot be 0".to_string(),
            ));
        }
        if self.samples_data_capacity == 0
            || self.samples_data_capacity > MAX_SAMPLES_DATA_CAPACITY
        {
            return Err(ProfCtlError::InvalidProfile(format!(
                "samples data capacity must be between 1 and {MAX_SAMPLES_DATA_CAPACITY} bytes"
            )));
        }
        Ok(())
    }
}

/// The active profiling engine instance. Its existence means a profile is in progress.
#[derive(Debug)]
pub struct Collector {
    settings: CollectorSettings,
    samples_file: String,
    opened_at: Instant,
    polls: u64,
}

impl Collector {
    fn open(settings: CollectorSettings) -> Self {
        let samples_file = resolve_samples_file(&settings.samples_file_pattern);
        Self {
            settings,
            samples_file,
            opened_at: Instant::now(),
            polls: 0,
        }
    }

    fn poll(&mut self) {
        self.polls += 1;
        trace!(
            "collector poll #{} for samples file {}",
            self.polls, self.samples_file
        );
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn samples_file(&self) -> &str {
        &self.samples_file
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }
}

/// What a collector reports when it is closed.
#[derive(Debug, Clone)]
pub struct CollectorSummary {
    pub samples_file: String,
    pub polls: u64,
    pub elapsed: Duration,
}

impl fmt::Display for CollectorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples file {}, {} polls in {} ms",
            self.samples_file,
            self.polls,
            self.elapsed.as_millis()
        )
    }
}

/// An owned slot holding at most one `Collector`.
#[derive(Debug, Default)]
pub struct CollectorSlot {
    collector: Option<Collector>,
}

impl CollectorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a collector, failing without constructing one if the slot is occupied.
    pub fn open(&mut self, settings: CollectorSettings) -> Result<&Collector, ProfCtlError> {
        if self.collector.is_some() {
            return Err(ProfCtlError::ProfileAlreadyActive);
        }
        settings.validate()?;
        Ok(self.collector.insert(Collector::open(settings)))
    }

    pub fn close(&mut self) -> Option<CollectorSummary> {
        self.collector.take().map(|collector| CollectorSummary {
            samples_file: collector.samples_file,
            polls: collector.polls,
            elapsed: collector.opened_at.elapsed(),
        })
    }

    pub fn poll(&mut self) {
        if let Some(collector) = self.collector.as_mut() {
            collector.poll();
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.collector.is_some()
    }

    pub fn get(&self) -> Option<&Collector> {
        self.collector.as_ref()
    }
}

fn resolve_samples_file(pattern: &str) -> String {
    let tag = format!(
        "{}-{}",
        std::process::id(),
        Local::now().format("%Y%m%d-%H%M%S")
    );
    pattern.replacen('*', &tag, 1)
}
