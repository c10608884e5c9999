//! Configuration management for the DNS flood guard.
//!
//! This module handles loading and managing application configuration
//! from defaults, an optional configuration file and environment variables.

use std::env;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};

use crate::models::Config;

/// Load configuration from defaults, `CONFIG_FILE` and `DNSFLOOD__*` variables
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());

    let config = ConfigBuilder::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8081)?
        .set_default("controller.base_url", "http://127.0.0.1:8080")?
        .set_default("controller.switches_path", "/wm/core/controller/switches/json")?
        .set_default("controller.flow_pusher_path", "/wm/staticflowpusher/json")?
        .set_default("controller.request_timeout_ms", 2000)?
        .set_default("detection.dns_port", 53)?
        .set_default("detection.window_ms", 1000)?
        .set_default("detection.history_size", 30)?
        .set_default("detection.k_sigma", 3.0)?
        .set_default("detection.ban_seconds", 30)?
        .set_default("detection.offender_fraction", 0.20)?
        .set_default("detection.offender_min_packets", 20)?
        .set_default("detection.max_tracked_domains", 100_000)?
        .set_default("detection.tick_rollover", false)?
        .set_default("mitigation.queue_capacity", 1024)?
        .set_default("mitigation.rule_priority", 32768)?
        .set_default("metrics.enabled", true)?
        .set_default("metrics.listen_address", "127.0.0.1:9090")?
        .add_source(File::with_name(&config_file).required(false))
        .add_source(Environment::with_prefix("DNSFLOOD").separator("__").try_parsing(true))
        .build()?;

    let config: Config = config.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
