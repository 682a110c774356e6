//! Per-tier hit counters.

use ledgerline_confidence::ResolutionTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by concurrent resolutions.
#[derive(Debug, Default)]
pub(crate) struct TierCounters([AtomicU64; 7]);

impl TierCounters {
    pub(crate) fn record(&self, tier: ResolutionTier) {
        self.0[tier as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        for counter in &self.0 {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> ResolutionStats {
        let counts = ResolutionTier::ALL
            .iter()
            .map(|&tier| (tier, self.0[tier as usize].load(Ordering::Relaxed)))
            .collect();
        ResolutionStats { counts }
    }
}

/// Point-in-time tier histogram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub counts: BTreeMap<ResolutionTier, u64>,
}

impl ResolutionStats {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, tier: ResolutionTier) -> u64 {
        self.counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn found(&self) -> u64 {
        self.total() - self.count(ResolutionTier::Unmapped)
    }

    /// Share of all resolutions, in percent rounded to one decimal.
    pub fn percent(&self, tier: ResolutionTier) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.count(tier) as f64 / total as f64 * 1000.0).round() / 10.0
    }
}
