//! DNS flood detection engine.
//!
//! All window, history and ban state lives behind one mutex. Every event and
//! every window close runs under that lock, so a rollover always sees the
//! complete window it is closing. Drop-rule requests are collected while the
//! lock is held and handed to the mitigation queue after it is released.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, trace, warn};
use metrics::{gauge, increment_counter};

use super::ban_table::BanTable;
use super::dns::{base_domain, extract_query_name};
use super::flood_detector::{classify, select_offenders, FloodSignals, OffenderSelection};
use super::history::{Baseline, HistoryTracker};
use super::mitigation::{DispatchError, DropKind, DropRequest, MitigationQueue};
use super::stats::shannon_entropy;
use super::window::{WindowAggregator, WindowSnapshot};
use super::DetectionConfig;
use crate::utils::Clock;

/// What happened to one inbound DNS request.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Aggregated into the current window.
    Recorded,
    /// Aggregated, and it closed the window.
    WindowClosed(WindowReport),
    /// Source is banned; the event was discarded and the rule refreshed.
    Dropped { remaining_seconds: u64 },
    /// No question name could be decoded.
    Malformed,
}

/// Decision taken for one domain at a window boundary.
#[derive(Debug, Clone)]
pub struct DomainVerdict {
    pub domain: String,
    pub volume: u64,
    pub entropy: f64,
    /// `None` while the domain's history is still filling up.
    pub baseline: Option<Baseline>,
    pub signals: FloodSignals,
    /// Present only for flagged domains.
    pub selection: Option<OffenderSelection>,
}

impl DomainVerdict {
    pub fn is_flood(&self) -> bool {
        self.signals.is_flood()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindowReport {
    pub started_at: i64,
    pub closed_at: i64,
    /// Sorted by domain.
    pub verdicts: Vec<DomainVerdict>,
}

impl WindowReport {
    pub fn verdict(&self, domain: &str) -> Option<&DomainVerdict> {
        self.verdicts.iter().find(|v| v.domain == domain)
    }

    pub fn floods(&self) -> impl Iterator<Item = &DomainVerdict> {
        self.verdicts.iter().filter(|v| v.is_flood())
    }
}

struct EngineState {
    window: WindowAggregator,
    history: HistoryTracker,
    bans: BanTable,
}

pub struct DetectionEngine {
    config: DetectionConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    mitigation: MitigationQueue,
}

impl DetectionEngine {
    pub fn new(config: DetectionConfig, clock: Arc<dyn Clock>, mitigation: MitigationQueue) -> Self {
        let now = clock.now_millis();
        let state = EngineState {
            window: WindowAggregator::new(config.window_ms, now),
            history: HistoryTracker::new(config.history_size, config.max_tracked_domains),
            bans: BanTable::new(),
        };

        Self {
            config,
            clock,
            state: Mutex::new(state),
            mitigation,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Process one DNS request sent by `source`.
    ///
    /// `message` is the UDP payload of a datagram already known to target the
    /// DNS port.
    pub fn handle_query(&self, source: Ipv4Addr, message: &[u8]) -> EventOutcome {
        let mut requests = Vec::new();
        let outcome = {
            let mut state = self.lock();
            let now = self.clock.now_millis();

            if state.bans.is_banned(source, now) {
                let remaining_seconds = state.bans.remaining_seconds(source, now);
                requests.push(DropRequest {
                    source,
                    hard_timeout_secs: remaining_seconds,
                    kind: DropKind::Refresh,
                });
                increment_counter!("dns_flood_banned_events_total");
                EventOutcome::Dropped { remaining_seconds }
            } else if let Some(query_name) = extract_query_name(message) {
                let domain = base_domain(&query_name);
                state.window.record(domain, source, &query_name);
                increment_counter!("dns_flood_events_total");

                if state.window.is_due(now) {
                    let snapshot = state.window.rollover(now);
                    let report = self.close_window(&mut state, snapshot, now, &mut requests);
                    EventOutcome::WindowClosed(report)
                } else {
                    EventOutcome::Recorded
                }
            } else {
                trace!("Dropping undecodable DNS payload from {}", source);
                increment_counter!("dns_flood_malformed_events_total");
                EventOutcome::Malformed
            }
        };

        self.dispatch(requests);
        outcome
    }

    /// Close the current window if it is due, regardless of traffic.
    pub fn tick(&self) -> Option<WindowReport> {
        let mut requests = Vec::new();
        let report = {
            let mut state = self.lock();
            let now = self.clock.now_millis();
            if !state.window.is_due(now) {
                return None;
            }
            let snapshot = state.window.rollover(now);
            self.close_window(&mut state, snapshot, now, &mut requests)
        };

        self.dispatch(requests);
        Some(report)
    }

    pub fn is_banned(&self, source: Ipv4Addr) -> bool {
        let now = self.clock.now_millis();
        self.lock().bans.is_banned(source, now)
    }

    pub fn remaining_seconds(&self, source: Ipv4Addr) -> u64 {
        let now = self.clock.now_millis();
        self.lock().bans.remaining_seconds(source, now)
    }

    pub fn tracked_domains(&self) -> usize {
        self.lock().history.tracked_domains()
    }

    /// Ban records held, including expired ones not yet looked up.
    pub fn active_bans(&self) -> usize {
        self.lock().bans.len()
    }

    pub fn pending_events(&self) -> u64 {
        self.lock().window.pending_events()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_window(
        &self,
        state: &mut EngineState,
        snapshot: WindowSnapshot,
        now: i64,
        requests: &mut Vec<DropRequest>,
    ) -> WindowReport {
        let mut domains: Vec<_> = snapshot.domains.into_iter().collect();
        domains.sort_by(|a, b| a.0.cmp(&b.0));

        let mut verdicts = Vec::with_capacity(domains.len());
        for (domain, window) in domains {
            let volume = window.volume();
            if volume == 0 {
                continue;
            }
            let entropy = shannon_entropy(&window.query_names);
            info!("DNS WINDOW | domain={} volume={} entropy={:.4}", domain, volume, entropy);

            state.history.append(&domain, volume, entropy);
            let baseline = state.history.baseline(&domain);

            let mut verdict = DomainVerdict {
                domain,
                volume,
                entropy,
                baseline,
                signals: FloodSignals::default(),
                selection: None,
            };

            if let Some(baseline) = baseline {
                info!(
                    "STATS | domain={} vMean={:.3} vStd={:.3} eMean={:.4} eStd={:.4}",
                    verdict.domain,
                    baseline.volume_mean,
                    baseline.volume_std,
                    baseline.entropy_mean,
                    baseline.entropy_std
                );

                verdict.signals = classify(volume, entropy, &baseline, self.config.k_sigma);
                if verdict.signals.is_flood() {
                    warn!(
                        "DNS FLOOD DETECTED | domain={} volume={} entropy={:.4} volume_signal={} entropy_signal={}",
                        verdict.domain, volume, entropy, verdict.signals.volume, verdict.signals.entropy
                    );
                    increment_counter!("dns_flood_detections_total");

                    let selection = select_offenders(&window.sources, volume, &self.config);
                    if selection.offenders.is_empty() {
                        warn!("No source data for flagged domain {}, nothing to ban", verdict.domain);
                    }
                    for offender in &selection.offenders {
                        let expiry = state.bans.ban(offender.source, self.config.ban_seconds, now);
                        warn!(
                            "BAN | source={} duration={}s domain={} count={} threshold={} volume={} expires_at_ms={}",
                            offender.source,
                            self.config.ban_seconds,
                            verdict.domain,
                            offender.count,
                            selection.threshold,
                            volume,
                            expiry
                        );
                        increment_counter!("dns_flood_bans_total");
                        requests.push(DropRequest {
                            source: offender.source,
                            hard_timeout_secs: self.config.ban_seconds,
                            kind: DropKind::NewBan,
                        });
                    }
                    verdict.selection = Some(selection);
                }
            }

            verdicts.push(verdict);
        }

        increment_counter!("dns_flood_windows_closed_total");
        gauge!("dns_flood_tracked_domains", state.history.tracked_domains() as f64);
        debug!(
            "Closed window {}..{} with {} domains",
            snapshot.started_at,
            snapshot.closed_at,
            verdicts.len()
        );

        WindowReport {
            started_at: snapshot.started_at,
            closed_at: snapshot.closed_at,
            verdicts,
        }
    }

    fn dispatch(&self, requests: Vec<DropRequest>) {
        for request in requests {
            let source = request.source;
            let kind = request.kind;
            match self.mitigation.submit(request) {
                Ok(()) => {}
                Err(DispatchError::QueueFull) => {
                    increment_counter!("dns_flood_dispatch_overflows_total");
                    match kind {
                        DropKind::NewBan => warn!("Mitigation queue full, drop rule for {} deferred to next packet", source),
                        DropKind::Refresh => debug!("Mitigation queue full, skipping refresh for {}", source),
                    }
                }
                Err(e) => error!("Cannot request drop rule for {}: {}", source, e),
            }
        }
    }
}
