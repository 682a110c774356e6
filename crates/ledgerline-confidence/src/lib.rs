//! Ledgerline Confidence: deterministic reliability scores for every step
//!
//! Every mapping, aggregation and calculation in a ledgerline run carries a
//! score in `[0, 1]`. The scores are rule-based and fully reproducible:
//!
//! ```text
//! ┌──────────────┐   base table    ┌──────────────┐
//! │  Resolution  │───────────────►│  Mapped node │──┐
//! │  tier 0..5   │                 └──────────────┘  │ min(inputs) × t
//! └──────────────┘                                   ▼
//! ┌──────────────┐   base table    ┌──────────────┐     ┌───────────────┐
//! │  Aggregation │───────────────►│  Aggregated  │────►│  Calculated   │
//! │  strategy    │  − conflict     └──────────────┘     │  (× formula)  │
//! └──────────────┘                                      └───────┬───────┘
//!                                                               │
//!                                                      ┌────────▼────────┐
//!                                                      │ Blocking policy │
//!                                                      │ PASS/WARN/BLOCK │
//!                                                      └─────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Confidence degrades through transformations and never improves:
//!   `output = min(inputs) × t`, capped at `min(inputs)`, floored at `0.00`.
//! - An input of exactly `0.00` means missing data and always blocks a model.
//! - Nothing in this crate panics or errors on missing inputs; every function
//!   returns a score together with a human-readable explanation.

pub mod aggregation;
pub mod blocking;
pub mod legacy;
pub mod mapping;
pub mod propagation;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use aggregation::{
    aggregation_confidence, recovery_confidence, AggregationStrategy, CONFLICT_PENALTY,
};
pub use blocking::{
    BlockingPolicy, BlockingVerdict, Finding, InputThreshold, ModelRules, ModelType,
    VerdictStatus,
};
pub use mapping::{
    fuzzy_confidence, hierarchy_confidence, mapping_confidence, MappingEvidence, ResolutionTier,
};
pub use propagation::{propagate, FormulaKind, Propagation};

/// Tolerance used when comparing confidences along a lineage path.
pub const MONOTONIC_EPSILON: f64 = 1e-6;

// ============================================================================
// Confidence
// ============================================================================

/// A reliability score in `[0, 1]`.
///
/// `Confidence::new` clamps. Deserialization does not, so documents read from
/// disk keep whatever value they carried and validation can flag it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const ONE: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Build from hundredths (`95` → `0.95`) so table values are exact.
    pub fn from_hundredths(hundredths: u32) -> Self {
        Self::new(hundredths as f64 / 100.0)
    }

    /// Wrap a raw value without clamping.
    pub const fn from_raw(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Finite and within `[0, 1]`.
    pub fn is_valid(self) -> bool {
        self.0.is_finite() && (0.0..=1.0).contains(&self.0)
    }

    /// Exactly zero: the "missing data" marker for blocking rules.
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    pub fn min(self, other: Confidence) -> Confidence {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }

    /// Multiply by a factor, clamping the result.
    pub fn scale(self, factor: f64) -> Confidence {
        Confidence::new(self.0 * factor)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A score together with the reason it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub confidence: Confidence,
    pub explanation: String,
}

impl Scored {
    pub fn new(confidence: Confidence, explanation: impl Into<String>) -> Self {
        Self {
            confidence,
            explanation: explanation.into(),
        }
    }
}
