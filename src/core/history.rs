//! Per-domain trailing history and k-sigma baselines.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

use super::stats::mean_and_std;

/// Population statistics over a domain's full history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub volume_mean: f64,
    pub volume_std: f64,
    pub entropy_mean: f64,
    pub entropy_std: f64,
}

#[derive(Debug, Default)]
struct DomainHistory {
    volumes: VecDeque<u64>,
    entropies: VecDeque<f64>,
}

impl DomainHistory {
    fn push(&mut self, volume: u64, entropy: f64, capacity: usize) {
        self.volumes.push_back(volume);
        self.entropies.push_back(entropy);
        while self.volumes.len() > capacity {
            self.volumes.pop_front();
        }
        while self.entropies.len() > capacity {
            self.entropies.pop_front();
        }
    }
}

/// Bounded FIFO history per domain.
///
/// The number of domains can be capped; when a new domain would exceed the
/// cap, the least recently updated domain is forgotten.
pub struct HistoryTracker {
    capacity: usize,
    domains: LruCache<String, DomainHistory>,
}

impl HistoryTracker {
    /// `max_domains == 0` means no cap.
    pub fn new(capacity: usize, max_domains: usize) -> Self {
        let domains = match NonZeroUsize::new(max_domains) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self { capacity, domains }
    }

    /// Push one window's metrics, evicting the oldest sample once full.
    pub fn append(&mut self, domain: &str, volume: u64, entropy: f64) {
        if let Some(history) = self.domains.get_mut(domain) {
            history.push(volume, entropy, self.capacity);
            return;
        }

        let mut history = DomainHistory::default();
        history.push(volume, entropy, self.capacity);
        if let Some((evicted, _)) = self.domains.push(domain.to_string(), history) {
            debug!("Domain cap reached, forgetting history of {}", evicted);
        }
    }

    /// Baseline over all stored samples, including the latest one.
    ///
    /// `None` until the domain holds a full history.
    pub fn baseline(&self, domain: &str) -> Option<Baseline> {
        let history = self.domains.peek(domain)?;
        if history.volumes.len() < self.capacity {
            return None;
        }

        let (volume_mean, volume_std) = mean_and_std(history.volumes.iter().map(|&v| v as f64));
        let (entropy_mean, entropy_std) = mean_and_std(history.entropies.iter().copied());
        Some(Baseline {
            volume_mean,
            volume_std,
            entropy_mean,
            entropy_std,
        })
    }

    pub fn len(&self, domain: &str) -> usize {
        self.domains.peek(domain).map_or(0, |h| h.volumes.len())
    }

    #[cfg(test)]
    fn volumes(&self, domain: &str) -> Vec<u64> {
        self.domains
            .peek(domain)
            .map(|h| h.volumes.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn tracked_domains(&self) -> usize {
        self.domains.len()
    }
}
