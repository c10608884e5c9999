//! Core functionality for the DNS flood guard.
//!
//! This module contains the detection engine and its components: query
//! decoding, window aggregation, baselines, flood classification, bans and
//! the mitigation driver that talks to the control plane.

pub mod actuator;
pub mod ban_table;
pub mod dns;
pub mod engine;
pub mod flood_detector;
pub mod floodlight;
pub mod history;
pub mod mitigation;
pub mod stats;
pub mod window;

use serde::{Deserialize, Serialize};

/// Detection tunables. Fixed once the engine is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Destination port of DNS requests
    pub dns_port: u16,
    /// Window width in milliseconds
    pub window_ms: u64,
    /// Number of past windows kept per domain
    pub history_size: usize,
    /// Standard deviations above the mean that count as a flood
    pub k_sigma: f64,
    /// Duration of one ban in seconds
    pub ban_seconds: u64,
    /// Share of the window volume a source needs to be banned
    pub offender_fraction: f64,
    /// Minimum packets a source needs to be banned
    pub offender_min_packets: u64,
    /// Cap on domains with history, 0 for no cap
    pub max_tracked_domains: usize,
    /// Close windows on a timer instead of on the next packet
    pub tick_rollover: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dns_port: 53,
            window_ms: 1000,
            history_size: 30,
            k_sigma: 3.0,
            ban_seconds: 30,
            offender_fraction: 0.20,
            offender_min_packets: 20,
            max_tracked_domains: 100_000,
            tick_rollover: false,
        }
    }
}

pub use actuator::{ActuatorError, DropRule, EnforcementActuator, PointId};
pub use ban_table::BanTable;
pub use engine::{DetectionEngine, DomainVerdict, EventOutcome, WindowReport};
pub use floodlight::FloodlightClient;
pub use history::{Baseline, HistoryTracker};
pub use mitigation::{mitigation_queue, DropKind, DropRequest, MitigationDriver, MitigationQueue};
pub use window::{WindowAggregator, WindowSnapshot};
