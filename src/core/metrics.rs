// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the profiler control core.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, TextEncoder, register_counter, register_gauge};

lazy_static! {
    // --- Gauges ---
    /// 1 while a collector exists, 0 otherwise.
    pub static ref PROFILE_ACTIVE: Gauge =
        register_gauge!("profctl_profile_active", "Indicates if a profile is active (1 for true, 0 for false).").unwrap();
    /// The session currently driving the engine (0 dormant, 1 local, 2 remote).
    pub static ref SESSION_TYPE: Gauge =
        register_gauge!("profctl_session_type", "Active session type (0 dormant, 1 local, 2 remote).").unwrap();

    // --- Counters ---
    /// The total number of remote clients that became the session client.
    pub static ref REMOTE_CLIENTS_ACCEPTED_TOTAL: Counter =
        register_counter!("profctl_remote_clients_accepted_total", "Total number of remote clients accepted.").unwrap();
    /// The total number of connections refused because a client was already connected.
    pub static ref REMOTE_CLIENTS_REJECTED_TOTAL: Counter =
        register_counter!("profctl_remote_clients_rejected_total", "Total number of remote connections refused.").unwrap();
    /// The total number of request frames received from remote clients.
    pub static ref FRAMES_RECEIVED_TOTAL: Counter =
        register_counter!("profctl_frames_received_total", "Total number of request frames received.").unwrap();
    /// The total number of requests answered with an error.
    pub static ref REQUESTS_FAILED_TOTAL: Counter =
        register_counter!("profctl_requests_failed_total", "Total number of requests that failed.").unwrap();
    /// The total number of profiles started, by any session.
    pub static ref PROFILES_STARTED_TOTAL: Counter =
        register_counter!("profctl_profiles_started_total", "Total number of profiles started.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
