//! SDN controller REST client for the mitigation driver.
//!
//! Switches are listed through the controller's switch inventory and drop
//! rules are pushed as named static flow entries. Entry names are derived
//! from the banned source and the switch, so pushing again replaces the
//! existing entry and restarts its hard timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::actuator::{ActuatorError, DropRule, EnforcementActuator, PointId};
use crate::models::ControllerConfig;
use crate::utils::format_rule_name;

const RULE_NAME_PREFIX: &str = "dnsflood-drop";

/// Switch inventory entry
#[derive(Debug, Deserialize)]
pub struct SwitchInfo {
    /// Datapath ID
    #[serde(rename = "switchDPID")]
    pub dpid: String,
}

/// Static flow entry as accepted by the flow pusher
#[derive(Debug, Serialize, PartialEq)]
pub struct StaticFlowEntry {
    pub switch: String,
    pub name: String,
    pub priority: String,
    pub active: String,
    pub eth_type: String,
    pub ipv4_src: String,
    pub ip_proto: String,
    pub udp_dst: String,
    pub hard_timeout: String,
    /// Empty action list drops the packet
    pub actions: String,
}

impl StaticFlowEntry {
    pub fn drop_rule(point: &PointId, rule: &DropRule) -> Self {
        let source = rule.source.to_string();
        Self {
            switch: point.0.clone(),
            name: format_rule_name(RULE_NAME_PREFIX, &source, &point.0),
            priority: rule.priority.to_string(),
            active: "true".to_string(),
            eth_type: "0x0800".to_string(),
            ipv4_src: source,
            ip_proto: "0x11".to_string(),
            udp_dst: rule.destination_port.to_string(),
            hard_timeout: rule.hard_timeout_secs.to_string(),
            actions: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    status: String,
}

/// Parse the switch inventory body into enforcement points.
fn parse_switches(body: &str) -> Result<Vec<PointId>, ActuatorError> {
    let switches: Vec<SwitchInfo> =
        serde_json::from_str(body).map_err(|e| ActuatorError::InvalidResponse(e.to_string()))?;
    Ok(switches.into_iter().map(|s| PointId(s.dpid)).collect())
}

/// The flow pusher answers 200 even when it refuses an entry; only the
/// status text tells the outcome.
fn parse_push_status(body: &str) -> Result<(), ActuatorError> {
    let response: PushResponse =
        serde_json::from_str(body).map_err(|e| ActuatorError::InvalidResponse(e.to_string()))?;
    if response.status.starts_with("Entry pushed") {
        Ok(())
    } else {
        Err(ActuatorError::Rejected(response.status))
    }
}

/// Controller REST client
pub struct FloodlightClient {
    /// HTTP client
    client: Client,
    /// Controller base URL, e.g. `http://127.0.0.1:8080`
    base_url: String,
    switches_path: String,
    flow_pusher_path: String,
}

impl FloodlightClient {
    /// Create a new controller client instance
    pub fn new(config: &ControllerConfig) -> Result<Self, ActuatorError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            switches_path: config.switches_path.clone(),
            flow_pusher_path: config.flow_pusher_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl EnforcementActuator for FloodlightClient {
    async fn enumerate_enforcement_points(&self) -> Result<Vec<PointId>, ActuatorError> {
        let response = self
            .client
            .get(self.url(&self.switches_path))
            .send()
            .await?
            .error_for_status()?;

        parse_switches(&response.text().await?)
    }

    async fn install_drop_rule(&self, point: &PointId, rule: &DropRule) -> Result<(), ActuatorError> {
        let entry = StaticFlowEntry::drop_rule(point, rule);
        let response = self
            .client
            .post(self.url(&self.flow_pusher_path))
            .header("Content-Type", "application/json")
            .json(&entry)
            .send()
            .await?
            .error_for_status()?;

        parse_push_status(&response.text().await?)
    }
}
