//! Flood classification and offender selection.
//!
//! A domain floods when either its window volume or its query-name entropy
//! exceeds `mean + k * std` of its baseline. Offenders are then chosen from
//! the per-source packet counts of that domain's window.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::history::Baseline;
use super::DetectionConfig;

/// Which k-sigma rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloodSignals {
    pub volume: bool,
    pub entropy: bool,
}

impl FloodSignals {
    pub fn is_flood(&self) -> bool {
        self.volume || self.entropy
    }
}

/// Apply the k-sigma rule to both metrics.
pub fn classify(volume: u64, entropy: f64, baseline: &Baseline, k: f64) -> FloodSignals {
    FloodSignals {
        volume: volume as f64 > baseline.volume_mean + k * baseline.volume_std,
        entropy: entropy > baseline.entropy_mean + k * baseline.entropy_std,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offender {
    pub source: Ipv4Addr,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffenderSelection {
    /// Minimum per-source count that qualifies for a ban.
    pub threshold: u64,
    pub offenders: Vec<Offender>,
}

/// `ceil(max(min_packets, fraction * volume))`
pub fn offender_threshold(volume: u64, fraction: f64, min_packets: u64) -> u64 {
    (min_packets as f64).max(fraction * volume as f64).ceil() as u64
}

/// Pick every source at or above the threshold, or the single heaviest
/// source if none qualifies.
pub fn select_offenders(
    sources: &HashMap<Ipv4Addr, u64>,
    volume: u64,
    config: &DetectionConfig,
) -> OffenderSelection {
    let threshold = offender_threshold(volume, config.offender_fraction, config.offender_min_packets);

    let mut ranked: Vec<Offender> = sources
        .iter()
        .map(|(&source, &count)| Offender { source, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.source.cmp(&b.source)));

    let qualifying = ranked.iter().take_while(|o| o.count >= threshold).count();
    let offenders = if qualifying > 0 {
        ranked.truncate(qualifying);
        ranked
    } else {
        ranked.into_iter().take(1).collect()
    };

    OffenderSelection {
        threshold,
        offenders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn flat_baseline(volume: f64, entropy: f64) -> Baseline {
        Baseline {
            volume_mean: volume,
            volume_std: 0.0,
            entropy_mean: entropy,
            entropy_std: 0.0,
        }
    }

    #[test]
    fn test_threshold_for_volume_100() {
        assert_eq!(offender_threshold(100, 0.20, 20), 20);
        assert_eq!(offender_threshold(10, 0.20, 20), 20);
        assert_eq!(offender_threshold(500, 0.20, 20), 100);
        assert_eq!(offender_threshold(101, 0.20, 20), 21);
    }

    #[test]
    fn test_selects_every_source_at_threshold() {
        let sources = HashMap::from([(ip(1), 20), (ip(2), 45), (ip(3), 19), (ip(4), 16)]);
        let selection = select_offenders(&sources, 100, &DetectionConfig::default());

        assert_eq!(selection.threshold, 20);
        assert_eq!(
            selection.offenders,
            vec![
                Offender { source: ip(2), count: 45 },
                Offender { source: ip(1), count: 20 },
            ]
        );
    }

    #[test]
    fn test_falls_back_to_top_source() {
        let sources: HashMap<_, _> = (1..=10).map(|i| (ip(i), 10 + i as u64)).collect();
        let volume = sources.values().sum();
        let selection = select_offenders(&sources, volume, &DetectionConfig::default());

        assert_eq!(selection.offenders, vec![Offender { source: ip(10), count: 20 }]);
    }

    #[test]
    fn test_no_sources_selects_nobody() {
        let selection = select_offenders(&HashMap::new(), 0, &DetectionConfig::default());
        assert!(selection.offenders.is_empty());
        assert_eq!(selection.threshold, 20);
    }

    #[test]
    fn test_classify_volume_and_entropy() {
        let baseline = flat_baseline(25.0, 0.0);
        assert!(!classify(25, 0.0, &baseline, 3.0).is_flood());

        let spike = classify(500, 0.0, &baseline, 3.0);
        assert!(spike.volume && !spike.entropy);

        let dga = classify(25, 4.5, &baseline, 3.0);
        assert!(!dga.volume && dga.entropy);
    }

    #[test]
    fn test_classify_respects_k_sigma() {
        let baseline = Baseline {
            volume_mean: 100.0,
            volume_std: 10.0,
            entropy_mean: 2.0,
            entropy_std: 0.5,
        };
        assert!(!classify(130, 3.5, &baseline, 3.0).is_flood());
        assert!(classify(131, 3.5, &baseline, 3.0).volume);
        assert!(classify(130, 3.51, &baseline, 3.0).entropy);
    }
}
