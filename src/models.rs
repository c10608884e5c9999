use std::net::Ipv4Addr;

use config::ConfigError;
use serde::{Deserialize, Serialize};

use crate::core::DetectionConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

/// SDN controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller REST base URL
    pub base_url: String,
    /// Switch inventory endpoint
    pub switches_path: String,
    /// Static flow pusher endpoint
    pub flow_pusher_path: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            switches_path: "/wm/core/controller/switches/json".to_string(),
            flow_pusher_path: "/wm/staticflowpusher/json".to_string(),
            request_timeout_ms: 2000,
        }
    }
}

/// Mitigation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationConfig {
    /// Pending drop-rule requests before new ones are discarded
    pub queue_capacity: usize,
    /// Priority of installed drop rules
    pub rule_priority: u16,
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            rule_priority: 32768,
        }
    }
}

/// Metrics exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to expose Prometheus metrics
    pub enabled: bool,
    /// Listen address of the exporter
    pub listen_address: String,
}

/// Application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Controller configuration
    pub controller: ControllerConfig,
    /// Detection configuration
    pub detection: DetectionConfig,
    /// Mitigation configuration
    pub mitigation: MitigationConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let detection = &self.detection;
        if detection.window_ms == 0 {
            return Err(ConfigError::Message("detection.window_ms must be positive".to_string()));
        }
        if detection.history_size == 0 {
            return Err(ConfigError::Message("detection.history_size must be positive".to_string()));
        }
        if !(detection.k_sigma >= 0.0) {
            return Err(ConfigError::Message("detection.k_sigma must not be negative".to_string()));
        }
        if detection.ban_seconds == 0 {
            return Err(ConfigError::Message("detection.ban_seconds must be positive".to_string()));
        }
        if !(detection.offender_fraction > 0.0 && detection.offender_fraction <= 1.0) {
            return Err(ConfigError::Message(
                "detection.offender_fraction must be in (0, 1]".to_string(),
            ));
        }
        if self.mitigation.queue_capacity == 0 {
            return Err(ConfigError::Message("mitigation.queue_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8081,
            },
            controller: ControllerConfig::default(),
            detection: DetectionConfig::default(),
            mitigation: MitigationConfig::default(),
            metrics: MetricsConfig {
                enabled: true,
                listen_address: "127.0.0.1:9090".to_string(),
            },
        }
    }
}

/// Packet-in event forwarded by the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketInRequest {
    pub source_address: Ipv4Addr,
    pub destination_port: u16,
    /// Transport protocol name, e.g. `udp`
    pub protocol: String,
    /// Transport payload
    #[serde(default)]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketVerdict {
    Ignored,
    Recorded,
    WindowClosed,
    Dropped,
    Malformed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketInResponse {
    pub verdict: PacketVerdict,
    /// Set for dropped packets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    /// Domains flagged when this packet closed a window
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanStatusResponse {
    pub source: Ipv4Addr,
    pub banned: bool,
    pub remaining_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_fraction_and_window() {
        let mut config = Config::default();
        config.detection.offender_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.window_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.k_sigma = f64::NAN;
        assert!(config.validate().is_err());
    }
}
