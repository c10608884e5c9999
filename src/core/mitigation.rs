//! Mitigation driver.
//!
//! The engine never talks to the control plane itself. It submits
//! [`DropRequest`]s to a bounded queue, and a single driver task fans each
//! request out to every enforcement point the actuator reports.

use std::net::Ipv4Addr;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error, info, warn};
use metrics::{counter, increment_counter};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::actuator::{DropRule, EnforcementActuator};

/// Errors that can occur when handing a request to the driver
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Mitigation queue is full")]
    QueueFull,
    #[error("Mitigation queue is closed")]
    QueueClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// First rule push for a freshly selected offender.
    NewBan,
    /// Re-push triggered by traffic from a source that is still banned.
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub source: Ipv4Addr,
    pub hard_timeout_secs: u64,
    pub kind: DropKind,
}

/// Sending half of the mitigation queue.
#[derive(Debug, Clone)]
pub struct MitigationQueue {
    sender: mpsc::Sender<DropRequest>,
}

impl MitigationQueue {
    /// Non-blocking hand-off.
    pub fn submit(&self, request: DropRequest) -> Result<(), DispatchError> {
        self.sender.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::QueueClosed,
        })
    }
}

pub fn mitigation_queue(capacity: usize) -> (MitigationQueue, mpsc::Receiver<DropRequest>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (MitigationQueue { sender }, receiver)
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementSummary {
    pub points: usize,
    pub installed: usize,
    pub failed: usize,
}

pub struct MitigationDriver {
    actuator: Arc<dyn EnforcementActuator>,
    destination_port: u16,
    priority: u16,
}

impl MitigationDriver {
    pub fn new(actuator: Arc<dyn EnforcementActuator>, destination_port: u16, priority: u16) -> Self {
        Self {
            actuator,
            destination_port,
            priority,
        }
    }

    /// Drain the queue until every sender is gone.
    pub async fn run(self, mut requests: mpsc::Receiver<DropRequest>) {
        info!("Mitigation driver started");
        while let Some(request) = requests.recv().await {
            self.enforce(&request).await;
        }
        info!("Mitigation driver stopped");
    }

    /// Push the drop rule for one request to every enforcement point.
    ///
    /// A failing point is logged and skipped; it never affects the others.
    pub async fn enforce(&self, request: &DropRequest) -> EnforcementSummary {
        let points = match self.actuator.enumerate_enforcement_points().await {
            Ok(points) => points,
            Err(e) => {
                error!("Failed to enumerate enforcement points for {}: {}", request.source, e);
                increment_counter!("dns_flood_enumeration_failures_total");
                return EnforcementSummary::default();
            }
        };

        let rule = DropRule {
            source: request.source,
            destination_port: self.destination_port,
            priority: self.priority,
            hard_timeout_secs: request.hard_timeout_secs,
        };

        let results = join_all(
            points
                .iter()
                .map(|point| self.actuator.install_drop_rule(point, &rule)),
        )
        .await;

        let mut summary = EnforcementSummary {
            points: points.len(),
            ..Default::default()
        };
        for (point, result) in points.iter().zip(results) {
            match result {
                Ok(()) => summary.installed += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to install drop rule for {} on {}: {}", request.source, point, e);
                }
            }
        }

        counter!("dns_flood_rule_installs_total", summary.installed as u64);
        counter!("dns_flood_rule_install_failures_total", summary.failed as u64);

        match request.kind {
            DropKind::NewBan => info!(
                "Drop rule for {} pushed to {}/{} enforcement points (hard_timeout={}s)",
                request.source, summary.installed, summary.points, request.hard_timeout_secs
            ),
            DropKind::Refresh => debug!(
                "Drop rule for {} refreshed on {}/{} enforcement points (hard_timeout={}s)",
                request.source, summary.installed, summary.points, request.hard_timeout_secs
            ),
        }
        if summary.points == 0 {
            warn!("No enforcement points available for {}", request.source);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actuator::{ActuatorError, MockEnforcementActuator, PointId};
    use tokio_test::assert_ok;

    const SRC: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

    fn new_ban(hard_timeout_secs: u64) -> DropRequest {
        DropRequest {
            source: SRC,
            hard_timeout_secs,
            kind: DropKind::NewBan,
        }
    }

    fn switches(ids: &'static [&'static str]) -> Vec<PointId> {
        ids.iter().map(|&id| PointId::from(id)).collect()
    }

    #[tokio::test]
    async fn test_installs_once_per_point() {
        let mut actuator = MockEnforcementActuator::new();
        actuator
            .expect_enumerate_enforcement_points()
            .times(1)
            .returning(|| Ok(switches(&["s1", "s2", "s3"])));
        actuator
            .expect_install_drop_rule()
            .withf(|_, rule| {
                rule.source == SRC
                    && rule.destination_port == 53
                    && rule.priority == 32768
                    && rule.hard_timeout_secs == 30
            })
            .times(3)
            .returning(|_, _| Ok(()));

        let driver = MitigationDriver::new(Arc::new(actuator), 53, 32768);
        let summary = driver.enforce(&new_ban(30)).await;

        assert_eq!(
            summary,
            EnforcementSummary {
                points: 3,
                installed: 3,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_failing_point_does_not_stop_others() {
        let mut actuator = MockEnforcementActuator::new();
        actuator
            .expect_enumerate_enforcement_points()
            .returning(|| Ok(switches(&["s1", "s2", "s3"])));
        actuator
            .expect_install_drop_rule()
            .times(3)
            .returning(|point, _| {
                if point.0 == "s2" {
                    Err(ActuatorError::Rejected("switch unreachable".to_string()))
                } else {
                    Ok(())
                }
            });

        let driver = MitigationDriver::new(Arc::new(actuator), 53, 32768);
        let summary = driver.enforce(&new_ban(30)).await;

        assert_eq!(summary.installed, 2);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_enumeration_failure_installs_nothing() {
        let mut actuator = MockEnforcementActuator::new();
        actuator
            .expect_enumerate_enforcement_points()
            .returning(|| Err(ActuatorError::InvalidResponse("bad json".to_string())));
        actuator.expect_install_drop_rule().never();

        let driver = MitigationDriver::new(Arc::new(actuator), 53, 32768);
        assert_eq!(driver.enforce(&new_ban(30)).await, EnforcementSummary::default());
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_closed() {
        let mut actuator = MockEnforcementActuator::new();
        actuator
            .expect_enumerate_enforcement_points()
            .times(2)
            .returning(|| Ok(switches(&["s1"])));
        actuator
            .expect_install_drop_rule()
            .times(2)
            .returning(|_, _| Ok(()));

        let (queue, receiver) = mitigation_queue(8);
        assert_ok!(queue.submit(new_ban(30)));
        assert_ok!(queue.submit(DropRequest {
            source: SRC,
            hard_timeout_secs: 12,
            kind: DropKind::Refresh,
        }));
        drop(queue);

        let driver = MitigationDriver::new(Arc::new(actuator), 53, 32768);
        tokio::time::timeout(std::time::Duration::from_secs(5), driver.run(receiver))
            .await
            .unwrap();
    }

    #[test]
    fn test_submit_reports_full_and_closed_queue() {
        let (queue, receiver) = mitigation_queue(1);
        assert_ok!(queue.submit(new_ban(30)));
        assert_eq!(queue.submit(new_ban(30)), Err(DispatchError::QueueFull));
        drop(receiver);
        assert_eq!(queue.submit(new_ban(30)), Err(DispatchError::QueueClosed));
    }
}
