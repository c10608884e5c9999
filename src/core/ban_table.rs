//! Time-bounded source bans.

use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Absolute ban expiries in milliseconds. Expired records are removed on
/// lookup; there is no background sweep.
#[derive(Debug, Default)]
pub struct BanTable {
    expiries: HashMap<Ipv4Addr, i64>,
}

impl BanTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ban `source` until `now + duration_secs`. An active ban is only ever
    /// extended, never shortened. Returns the effective expiry.
    pub fn ban(&mut self, source: Ipv4Addr, duration_secs: u64, now: i64) -> i64 {
        let expiry = now + duration_secs as i64 * 1000;
        let effective = match self.expiries.get(&source) {
            Some(&current) if current > now => current.max(expiry),
            _ => expiry,
        };
        self.expiries.insert(source, effective);
        effective
    }

    pub fn is_banned(&mut self, source: Ipv4Addr, now: i64) -> bool {
        match self.expiries.get(&source) {
            Some(&expiry) if now >= expiry => {
                self.expiries.remove(&source);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Whole seconds left on the ban, rounded up. 0 when not banned.
    pub fn remaining_seconds(&self, source: Ipv4Addr, now: i64) -> u64 {
        self.expiries
            .get(&source)
            .map(|&expiry| {
                let remaining = (expiry - now).max(0);
                ((remaining + 999) / 1000) as u64
            })
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn expiry(&self, source: Ipv4Addr) -> Option<i64> {
        self.expiries.get(&source).copied()
    }

    /// Records held, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}
