// src/core/engine/probes.rs

//! The registry of instrumentation probes known to the process.

use crate::core::ProfCtlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a probe by the call site it instruments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeKey {
    pub file: String,
    pub line: u32,
    pub name: String,
}

impl ProbeKey {
    pub fn new(file: impl Into<String>, line: u32, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.file, self.line)
    }
}

#[derive(Serialize)]
struct ProbeRecord<'a> {
    #[serde(flatten)]
    key: &'a ProbeKey,
    active: bool,
}

/// Tracks every registered probe and whether it is currently active.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    probes: BTreeMap<ProbeKey, bool>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a probe in the inactive state. Returns false if it was already known.
    pub fn register(&mut self, key: ProbeKey) -> bool {
        if self.probes.contains_key(&key) {
            return false;
        }
        self.probes.insert(key, false);
        true
    }

    /// Activates a probe. Returns whether the state changed.
    pub fn activate(&mut self, key: &ProbeKey) -> Result<bool, ProfCtlError> {
        self.set_state(key, true)
    }

    /// Deactivates a probe. Returns whether the state changed.
    pub fn deactivate(&mut self, key: &ProbeKey) -> Result<bool, ProfCtlError> {
        self.set_state(key, false)
    }

    fn set_state(&mut self, key: &ProbeKey, active: bool) -> Result<bool, ProfCtlError> {
        let state = self
            .probes
            .get_mut(key)
            .ok_or_else(|| ProfCtlError::ProbeNotFound(key.to_string()))?;
        let changed = *state != active;
        *state = active;
        Ok(changed)
    }

    pub fn is_active(&self, key: &ProbeKey) -> Option<bool> {
        self.probes.get(key).copied()
    }

    pub fn active_count(&self) -> usize {
        self.probes.values().filter(|active| **active).count()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Renders all probes as a JSON array of `{file, line, name, active}` objects,
    /// ordered by file, line and name.
    pub fn to_json(&self) -> Result<String, ProfCtlError> {
        let records: Vec<ProbeRecord<'_>> = self
            .probes
            .iter()
            .map(|(key, active)| ProbeRecord {
                key,
                active: *active,
            })
            .collect();
        Ok(serde_json::to_string(&records)?)
    }
}
