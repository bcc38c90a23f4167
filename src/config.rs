// src/config.rs

//! Manages host configuration: loading, resolving size values, and validation.

use crate::core::engine::{CollectorSettings, ProbeKey};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Settings for the TCP control endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// If false, the profiler can only be driven from within the process.
    #[serde(default = "default_remote_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    /// `0` binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: default_remote_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_remote_enabled() -> bool {
    true
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7979
}

/// Settings for a profile started by the host itself.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub samples_file_pattern: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Resolved from a byte count or a size string such as `"64mb"`.
    pub samples_data_capacity: u64,
    /// If true, a local profile is begun as soon as the host starts.
    pub autostart: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            samples_file_pattern: default_samples_file_pattern(),
            poll_interval: default_poll_interval(),
            samples_data_capacity: DEFAULT_SAMPLES_DATA_CAPACITY,
            autostart: false,
        }
    }
}

impl ProfileConfig {
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            samples_file_pattern: self.samples_file_pattern.clone(),
            poll_interval: self.poll_interval,
            samples_data_capacity: self.samples_data_capacity,
        }
    }
}

const DEFAULT_SAMPLES_DATA_CAPACITY: u64 = 64 * 1024 * 1024;

fn default_samples_file_pattern() -> String {
    "profctl-*.samples".to_string()
}
fn default_poll_interval() -> Duration {
    Duration::from_millis(10)
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8879
}

/// A probe the host registers at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub file: String,
    pub line: u32,
    pub name: String,
}

impl From<&ProbeConfig> for ProbeKey {
    fn from(probe: &ProbeConfig) -> Self {
        ProbeKey::new(probe.file.clone(), probe.line, probe.name.clone())
    }
}

/// The resolved and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    /// Overrides the timestamp counter rate reported by `tscHz`.
    pub tsc_hz: Option<u64>,
    pub remote: RemoteConfig,
    pub profile: ProfileConfig,
    pub metrics: MetricsConfig,
    pub probes: Vec<ProbeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tsc_hz: None,
            remote: RemoteConfig::default(),
            profile: ProfileConfig::default(),
            metrics: MetricsConfig::default(),
            probes: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum CapacityConfig {
    Bytes(u64),
    String(String),
}

/// The `[profile]` table as written, before its capacity is resolved.
#[derive(Deserialize)]
struct RawProfileConfig {
    #[serde(default = "default_samples_file_pattern")]
    samples_file_pattern: String,
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    poll_interval: Duration,
    #[serde(default = "default_capacity_config")]
    samples_data_capacity: CapacityConfig,
    #[serde(default)]
    autostart: bool,
}

impl Default for RawProfileConfig {
    fn default() -> Self {
        Self {
            samples_file_pattern: default_samples_file_pattern(),
            poll_interval: default_poll_interval(),
            samples_data_capacity: default_capacity_config(),
            autostart: false,
        }
    }
}

fn default_capacity_config() -> CapacityConfig {
    CapacityConfig::Bytes(DEFAULT_SAMPLES_DATA_CAPACITY)
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    tsc_hz: Option<u64>,
    #[serde(default)]
    remote: RemoteConfig,
    #[serde(default)]
    profile: RawProfileConfig,
    #[serde(default)]
    metrics: MetricsConfig,
    #[serde(default)]
    probes: Vec<ProbeConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file '{path}'"))
    }

    /// Parses, resolves and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let samples_data_capacity = resolve_capacity(raw_config.profile.samples_data_capacity)?;

        let config = Config {
            log_level: raw_config.log_level,
            tsc_hz: raw_config.tsc_hz,
            remote: raw_config.remote,
            profile: ProfileConfig {
                samples_file_pattern: raw_config.profile.samples_file_pattern,
                poll_interval: raw_config.profile.poll_interval,
                samples_data_capacity,
                autostart: raw_config.profile.autostart,
            },
            metrics: raw_config.metrics,
            probes: raw_config.probes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.remote.enabled && self.remote.host.trim().is_empty() {
            return Err(anyhow!("remote.host cannot be empty when remote is enabled"));
        }

        self.profile
            .collector_settings()
            .validate()
            .map_err(|e| anyhow!("invalid [profile] section: {e}"))?;

        if self.tsc_hz == Some(0) {
            return Err(anyhow!("tsc_hz cannot be 0"));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.remote.enabled && self.metrics.port == self.remote.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the remote control port"
                ));
            }
        }

        for (i, probe) in self.probes.iter().enumerate() {
            if probe.file.trim().is_empty() || probe.name.trim().is_empty() {
                return Err(anyhow!(
                    "invalid probe #{}: file and name cannot be empty",
                    i + 1
                ));
            }
        }

        if self.profile.autostart && self.remote.enabled {
            warn!(
                "profile.autostart is set: remote controllers will be refused until the local profile ends"
            );
        }
        Ok(())
    }
}

/// Resolves a `CapacityConfig` into a byte count.
fn resolve_capacity(cfg: CapacityConfig) -> Result<u64> {
    match cfg {
        CapacityConfig::Bytes(b) => Ok(b),
        CapacityConfig::String(s) => {
            let s_lower = s.trim().to_lowercase();
            if let Some(val_str) = s_lower.strip_suffix("gb") {
                parse_size_string(&s, val_str, 1024 * 1024 * 1024)
            } else if let Some(val_str) = s_lower.strip_suffix('g') {
                parse_size_string(&s, val_str, 1024 * 1024 * 1024)
            } else if let Some(val_str) = s_lower.strip_suffix("mb") {
                parse_size_string(&s, val_str, 1024 * 1024)
            } else if let Some(val_str) = s_lower.strip_suffix('m') {
                parse_size_string(&s, val_str, 1024 * 1024)
            } else if let Some(val_str) = s_lower.strip_suffix("kb") {
                parse_size_string(&s, val_str, 1024)
            } else if let Some(val_str) = s_lower.strip_suffix('k') {
                parse_size_string(&s, val_str, 1024)
            } else {
                s_lower.parse().with_context(|| {
                    format!(
                        "Invalid samples_data_capacity value '{s}'. Must be a number (bytes) or have a unit (e.g., '64mb')."
                    )
                })
            }
        }
    }
}

/// Parses a string number with a unit (kb, mb, gb) and applies a multiplier.
fn parse_size_string(original_str: &str, value_str: &str, multiplier: u64) -> Result<u64> {
    let value: u64 = value_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in samples_data_capacity: '{original_str}'"))?;
    value.checked_mul(multiplier).ok_or_else(|| {
        anyhow!("samples_data_capacity value '{original_str}' is too large")
    })
}
