//! Fixed-width window aggregation of DNS queries per base domain.

use std::collections::HashMap;
use std::mem;
use std::net::Ipv4Addr;

/// Everything observed for one domain during one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainWindow {
    /// Query names in arrival order, duplicates kept.
    pub query_names: Vec<String>,
    /// Packets per source address.
    pub sources: HashMap<Ipv4Addr, u64>,
}

impl DomainWindow {
    pub fn volume(&self) -> u64 {
        self.query_names.len() as u64
    }
}

/// Immutable hand-off of a closed window.
#[derive(Debug, Clone, Default)]
pub struct WindowSnapshot {
    pub started_at: i64,
    pub closed_at: i64,
    pub domains: HashMap<String, DomainWindow>,
}

impl WindowSnapshot {
    #[cfg(test)]
    pub fn total_events(&self) -> u64 {
        self.domains.values().map(DomainWindow::volume).sum()
    }
}

/// Accumulates the current window. Not synchronized; the owner serializes access.
#[derive(Debug)]
pub struct WindowAggregator {
    window_ms: i64,
    started_at: i64,
    domains: HashMap<String, DomainWindow>,
}

impl WindowAggregator {
    pub fn new(window_ms: u64, now: i64) -> Self {
        Self {
            window_ms: window_ms as i64,
            started_at: now,
            domains: HashMap::new(),
        }
    }

    /// Record one query. Empty domains or names are ignored.
    pub fn record(&mut self, domain: &str, source: Ipv4Addr, query_name: &str) -> bool {
        if domain.is_empty() || query_name.is_empty() {
            return false;
        }

        let entry = self.domains.entry(domain.to_string()).or_default();
        entry.query_names.push(query_name.to_string());
        *entry.sources.entry(source).or_insert(0) += 1;
        true
    }

    pub fn is_due(&self, now: i64) -> bool {
        now - self.started_at >= self.window_ms
    }

    /// Close the current window and start a new one at `now`.
    pub fn rollover(&mut self, now: i64) -> WindowSnapshot {
        let started_at = mem::replace(&mut self.started_at, now);
        WindowSnapshot {
            started_at,
            closed_at: now,
            domains: mem::take(&mut self.domains),
        }
    }

    #[cfg(test)]
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn pending_events(&self) -> u64 {
        self.domains.values().map(DomainWindow::volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC_A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
    const SRC_B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 6);

    #[test]
    fn test_record_counts_names_and_sources() {
        let mut window = WindowAggregator::new(1000, 0);
        assert!(window.record("example.com", SRC_A, "www.example.com"));
        assert!(window.record("example.com", SRC_A, "www.example.com"));
        assert!(window.record("example.com", SRC_B, "api.example.com"));
        assert!(window.record("evil.com", SRC_B, "x.evil.com"));

        assert_eq!(window.pending_events(), 4);
        let snapshot = window.rollover(1000);
        let example = &snapshot.domains["example.com"];
        assert_eq!(example.volume(), 3);
        assert_eq!(example.sources[&SRC_A], 2);
        assert_eq!(example.sources[&SRC_B], 1);
        assert_eq!(snapshot.total_events(), 4);
    }

    #[test]
    fn test_empty_inputs_are_ignored() {
        let mut window = WindowAggregator::new(1000, 0);
        assert!(!window.record("", SRC_A, "www.example.com"));
        assert!(!window.record("example.com", SRC_A, ""));
        assert_eq!(window.pending_events(), 0);
    }

    #[test]
    fn test_rollover_resets_state_and_start() {
        let mut window = WindowAggregator::new(1000, 500);
        window.record("example.com", SRC_A, "www.example.com");
        assert!(!window.is_due(1499));
        assert!(window.is_due(1500));

        let snapshot = window.rollover(1500);
        assert_eq!(snapshot.started_at, 500);
        assert_eq!(snapshot.closed_at, 1500);
        assert_eq!(window.started_at(), 1500);
        assert_eq!(window.pending_events(), 0);
        assert!(!window.is_due(2000));
    }
}
