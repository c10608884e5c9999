//! Port to the control plane that programs drop rules.

use std::fmt;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to an enforcement point
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Rule rejected: {0}")]
    Rejected(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Identifier of a device able to install drop rules (a switch DPID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub String);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        PointId(id.to_string())
    }
}

/// Drop UDP traffic from `source` to `destination_port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRule {
    pub source: Ipv4Addr,
    pub destination_port: u16,
    pub priority: u16,
    pub hard_timeout_secs: u64,
}

/// Control plane able to list enforcement points and push drop rules.
///
/// Re-installing a rule for the same source on the same point must replace
/// the existing rule.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnforcementActuator: Send + Sync {
    async fn enumerate_enforcement_points(&self) -> Result<Vec<PointId>, ActuatorError>;

    async fn install_drop_rule(&self, point: &PointId, rule: &DropRule) -> Result<(), ActuatorError>;
}
