//! Bucket aggregation with widening recovery passes.
//!
//! ```text
//! attempt 1  strict     bucket concepts only                    0.95
//! attempt 2  relaxed    + calculation descendants               0.70
//! attempt 3  desperate  + values whose presentation ancestry
//!                         reaches a bucket concept              0.40
//! attempt 4  failed     NO_DATA                                 0.00
//! ```
//!
//! The reported confidence is the smaller of the strategy confidence and
//! the recovery confidence of the attempt that produced data.

use crate::config::{AggregateConfig, BucketDefinition};
use crate::smart::{smart_aggregate, AggregateResult};
use ledgerline_confidence::{recovery_confidence, Scored};
use ledgerline_taxonomy::{ConceptId, TaxonomyProvider};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const FAILED_ATTEMPT: u32 = 4;

type CandidatePass = fn(
    &dyn TaxonomyProvider,
    &BucketDefinition,
    &BTreeMap<ConceptId, f64>,
    &AggregateConfig,
) -> Vec<ConceptId>;

const PASSES: [CandidatePass; 3] = [strict, relaxed, desperate];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketOutcome {
    pub bucket: String,
    pub result: AggregateResult,
    pub attempt: u32,
    pub recovery: Scored,
}

impl BucketOutcome {
    pub fn confidence(&self) -> Scored {
        let strategy = self.result.confidence();
        if self.attempt == 1 || strategy.confidence <= self.recovery.confidence {
            strategy
        } else {
            Scored::new(
                self.recovery.confidence,
                format!("{} ({})", strategy.explanation, self.recovery.explanation),
            )
        }
    }
}

pub fn aggregate_bucket(
    taxonomy: &dyn TaxonomyProvider,
    bucket: &BucketDefinition,
    values: &BTreeMap<ConceptId, f64>,
    config: &AggregateConfig,
) -> BucketOutcome {
    for (attempt, pass) in (1u32..).zip(PASSES) {
        let candidates = pass(taxonomy, bucket, values, config);
        let result = smart_aggregate(taxonomy, &candidates, values, config);
        if result.has_data() {
            if attempt > 1 {
                tracing::debug!(bucket = %bucket.name, attempt, "bucket recovered");
            }
            return BucketOutcome {
                bucket: bucket.name.clone(),
                result,
                attempt,
                recovery: recovery_confidence(attempt),
            };
        }
    }

    BucketOutcome {
        bucket: bucket.name.clone(),
        result: smart_aggregate(taxonomy, &[], values, config),
        attempt: FAILED_ATTEMPT,
        recovery: recovery_confidence(FAILED_ATTEMPT),
    }
}

fn strict(
    _taxonomy: &dyn TaxonomyProvider,
    bucket: &BucketDefinition,
    _values: &BTreeMap<ConceptId, f64>,
    _config: &AggregateConfig,
) -> Vec<ConceptId> {
    bucket.concepts.clone()
}

fn relaxed(
    taxonomy: &dyn TaxonomyProvider,
    bucket: &BucketDefinition,
    _values: &BTreeMap<ConceptId, f64>,
    _config: &AggregateConfig,
) -> Vec<ConceptId> {
    let mut candidates = bucket.concepts.clone();
    let descendants: BTreeSet<ConceptId> = bucket
        .concepts
        .iter()
        .flat_map(|c| taxonomy.all_descendants(c))
        .collect();
    candidates.extend(descendants);
    candidates
}

fn desperate(
    taxonomy: &dyn TaxonomyProvider,
    bucket: &BucketDefinition,
    values: &BTreeMap<ConceptId, f64>,
    config: &AggregateConfig,
) -> Vec<ConceptId> {
    let roots: BTreeSet<&ConceptId> = bucket.concepts.iter().collect();
    values
        .keys()
        .filter(|c| presentation_reaches(taxonomy, c, &roots, config.recovery_depth))
        .cloned()
        .collect()
}

/// Whether a presentation-parent walk from `start` hits any of `roots`.
fn presentation_reaches(
    taxonomy: &dyn TaxonomyProvider,
    start: &ConceptId,
    roots: &BTreeSet<&ConceptId>,
    max_depth: usize,
) -> bool {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([(start, 0usize)]);
    while let Some((current, depth)) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        if depth > 0 && roots.contains(&current) {
            return true;
        }
        if depth == max_depth {
            continue;
        }
        for parent in taxonomy.presentation_parents(current) {
            queue.push_back((parent, depth + 1));
        }
    }
    false
}
