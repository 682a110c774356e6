//! Aggregation confidence by strategy, plus the conflict penalty.

use crate::{Confidence, Scored};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Penalty (in hundredths) subtracted when a total/components conflict is detected.
pub const CONFLICT_PENALTY: u32 = 20;

/// How an aggregated value was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// A reported total line was trusted.
    TotalLineUsed,
    /// Only one value was present.
    SingleValue,
    /// Components were summed with nested double counting removed.
    ComponentSum,
    /// Several conflicting totals; the largest was taken.
    MaxValue,
}

impl AggregationStrategy {
    fn base_hundredths(self) -> u32 {
        match self {
            AggregationStrategy::TotalLineUsed => 95,
            AggregationStrategy::SingleValue => 90,
            AggregationStrategy::ComponentSum => 85,
            AggregationStrategy::MaxValue => 60,
        }
    }

    pub fn base_confidence(self) -> Confidence {
        Confidence::from_hundredths(self.base_hundredths())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationStrategy::TotalLineUsed => "total_line_used",
            AggregationStrategy::SingleValue => "single_value",
            AggregationStrategy::ComponentSum => "component_sum",
            AggregationStrategy::MaxValue => "max_value",
        }
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score an aggregation. A detected conflict costs 0.20, floored at zero.
pub fn aggregation_confidence(strategy: AggregationStrategy, conflict: bool) -> Scored {
    let mut explanation = match strategy {
        AggregationStrategy::TotalLineUsed => {
            "Total Line Used - explicit total from source data".to_string()
        }
        AggregationStrategy::SingleValue => {
            "Single Value - no aggregation ambiguity".to_string()
        }
        AggregationStrategy::ComponentSum => {
            "Component Sum - double counting prevented".to_string()
        }
        AggregationStrategy::MaxValue => {
            "Max Value - multiple conflicting totals, used maximum".to_string()
        }
    };

    let mut hundredths = strategy.base_hundredths();
    if conflict {
        hundredths = hundredths.saturating_sub(CONFLICT_PENALTY);
        explanation.push_str(" [total/components conflict detected]");
    }

    Scored::new(Confidence::from_hundredths(hundredths), explanation)
}

/// Confidence of a bucket recovered after the strict concept set found nothing.
///
/// Attempt 1 is strict, 2 relaxed, 3 desperate; anything else means failure.
pub fn recovery_confidence(attempt: u32) -> Scored {
    match attempt {
        1 => Scored::new(
            Confidence::from_hundredths(95),
            "Strict Recovery (attempt 1) - official bucket rules",
        ),
        2 => Scored::new(
            Confidence::from_hundredths(70),
            "Relaxed Recovery (attempt 2) - required fuzzy matching",
        ),
        3 => Scored::new(
            Confidence::from_hundredths(40),
            "Desperate Recovery (attempt 3) - last resort",
        ),
        _ => Scored::new(Confidence::ZERO, "Recovery Failed - all attempts exhausted"),
    }
}
