//! Mapping confidence: one base score per resolution tier.
//!
//! | tier | name            | confidence                          |
//! |------|-----------------|-------------------------------------|
//! | 0    | override        | 1.00                                |
//! | 1    | alias           | 0.95                                |
//! | 2    | exact label     | 0.90                                |
//! | 2.5  | fuzzy label     | score/100 × 0.90, within 0.50..0.90 |
//! | 3    | keyword         | 0.70                                |
//! | 4    | hierarchy       | 0.70 − 0.05 × depth, floor 0.50     |
//! | 5    | unmapped        | 0.00                                |

use crate::{Confidence, Scored};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The resolver's ordered strategies. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Override,
    Alias,
    ExactLabel,
    FuzzyLabel,
    Keyword,
    Hierarchy,
    Unmapped,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 7] = [
        ResolutionTier::Override,
        ResolutionTier::Alias,
        ResolutionTier::ExactLabel,
        ResolutionTier::FuzzyLabel,
        ResolutionTier::Keyword,
        ResolutionTier::Hierarchy,
        ResolutionTier::Unmapped,
    ];

    /// Tier number as written in audit output.
    pub fn ordinal(self) -> &'static str {
        match self {
            ResolutionTier::Override => "0",
            ResolutionTier::Alias => "1",
            ResolutionTier::ExactLabel => "2",
            ResolutionTier::FuzzyLabel => "2.5",
            ResolutionTier::Keyword => "3",
            ResolutionTier::Hierarchy => "4",
            ResolutionTier::Unmapped => "5",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResolutionTier::Override => "Override Memory",
            ResolutionTier::Alias => "Explicit Alias",
            ResolutionTier::ExactLabel => "Exact Taxonomy Label",
            ResolutionTier::FuzzyLabel => "Fuzzy Taxonomy Search",
            ResolutionTier::Keyword => "Keyword Fallback",
            ResolutionTier::Hierarchy => "Hierarchy Fallback",
            ResolutionTier::Unmapped => "Unmapped",
        }
    }

    /// Highest confidence a result of this tier can carry.
    pub fn base_confidence(self) -> Confidence {
        match self {
            ResolutionTier::Override => Confidence::from_hundredths(100),
            ResolutionTier::Alias => Confidence::from_hundredths(95),
            ResolutionTier::ExactLabel => Confidence::from_hundredths(90),
            ResolutionTier::FuzzyLabel => Confidence::from_hundredths(FUZZY_CEILING),
            ResolutionTier::Keyword => Confidence::from_hundredths(70),
            ResolutionTier::Hierarchy => Confidence::from_hundredths(HIERARCHY_START),
            ResolutionTier::Unmapped => Confidence::ZERO,
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {} ({})", self.ordinal(), self.name())
    }
}

const FUZZY_FLOOR: u32 = 50;
const FUZZY_CEILING: u32 = 90;
const HIERARCHY_START: u32 = 70;
const HIERARCHY_STEP: u32 = 5;
const HIERARCHY_FLOOR: u32 = 50;

/// What the resolver observed, carrying the tier-specific inputs to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum MappingEvidence {
    Override,
    Alias,
    ExactLabel,
    /// Blended fuzzy score on a 0..100 scale.
    Fuzzy { score: f64 },
    Keyword,
    /// Number of presentation levels walked to reach the safe parent.
    Hierarchy { depth: usize },
    Unmapped,
}

impl MappingEvidence {
    pub fn tier(&self) -> ResolutionTier {
        match self {
            MappingEvidence::Override => ResolutionTier::Override,
            MappingEvidence::Alias => ResolutionTier::Alias,
            MappingEvidence::ExactLabel => ResolutionTier::ExactLabel,
            MappingEvidence::Fuzzy { .. } => ResolutionTier::FuzzyLabel,
            MappingEvidence::Keyword => ResolutionTier::Keyword,
            MappingEvidence::Hierarchy { .. } => ResolutionTier::Hierarchy,
            MappingEvidence::Unmapped => ResolutionTier::Unmapped,
        }
    }
}

/// Hierarchy fallback confidence: 0.70 at depth 0, −0.05 per level, floor 0.50.
pub fn hierarchy_confidence(depth: usize) -> Confidence {
    let step = HIERARCHY_STEP.saturating_mul(depth.min(u32::MAX as usize) as u32);
    let hundredths = HIERARCHY_START.saturating_sub(step).max(HIERARCHY_FLOOR);
    Confidence::from_hundredths(hundredths)
}

/// Fuzzy label confidence from a 0..100 blended score.
pub fn fuzzy_confidence(score: f64) -> Confidence {
    let floor = FUZZY_FLOOR as f64 / 100.0;
    let ceiling = FUZZY_CEILING as f64 / 100.0;
    if !score.is_finite() {
        return Confidence::new(floor);
    }
    Confidence::new((score / 100.0 * ceiling).clamp(floor, ceiling))
}

/// Score a mapping decision.
pub fn mapping_confidence(evidence: &MappingEvidence) -> Scored {
    match *evidence {
        MappingEvidence::Override => Scored::new(
            ResolutionTier::Override.base_confidence(),
            "Override Memory - highest trust (user override)",
        ),
        MappingEvidence::Alias => Scored::new(
            ResolutionTier::Alias.base_confidence(),
            "Explicit Alias - manually curated mapping",
        ),
        MappingEvidence::ExactLabel => Scored::new(
            ResolutionTier::ExactLabel.base_confidence(),
            "Exact Label Match - official taxonomy label",
        ),
        MappingEvidence::Fuzzy { score } => Scored::new(
            fuzzy_confidence(score),
            format!("Fuzzy Taxonomy Search - blended score {score:.1}"),
        ),
        MappingEvidence::Keyword => Scored::new(
            ResolutionTier::Keyword.base_confidence(),
            "Keyword Fallback - substring rule",
        ),
        MappingEvidence::Hierarchy { depth } => Scored::new(
            hierarchy_confidence(depth),
            format!("Hierarchy Fallback (depth={depth}) - walked up presentation tree"),
        ),
        MappingEvidence::Unmapped => Scored::new(
            Confidence::ZERO,
            "Unmapped - failed to find matching concept",
        ),
    }
}
