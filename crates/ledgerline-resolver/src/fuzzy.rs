//! Fuzzy label search across every label role.
//!
//! Candidate groups run from narrowest to broadest. An exact hit on any role
//! ends the search; otherwise prefix, contains and any-token candidates are
//! pooled and ranked together.
//!
//! ```text
//! score = base(kind) × 0.7 + similarity × 100 × 0.2 + boost(role)
//! ```

use ledgerline_taxonomy::{LabelMatch, LabelQuery, LabelRole, MatchKind, TaxonomyProvider};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const BASE_WEIGHT: f64 = 0.7;
const SIMILARITY_WEIGHT: f64 = 0.2;

const PREFIX_ROLES: &[LabelRole] = &[LabelRole::Standard, LabelRole::Total, LabelRole::Net];
const CONTAINS_ROLES: &[LabelRole] = &[
    LabelRole::Standard,
    LabelRole::Terse,
    LabelRole::Total,
    LabelRole::Net,
];
const TOKEN_ROLES: &[LabelRole] = &[LabelRole::Standard, LabelRole::Terse, LabelRole::Total];

/// A ranked fuzzy candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyHit {
    #[serde(flatten)]
    pub label: LabelMatch,
    /// Normalized Levenshtein similarity in `[0, 1]`.
    pub similarity: f64,
    /// Blended score on a 0..100 scale (can exceed 100 by the role boost).
    pub score: f64,
}

pub fn blended_score(kind: MatchKind, similarity: f64, role: &LabelRole) -> f64 {
    kind.base_score() * BASE_WEIGHT + similarity * 100.0 * SIMILARITY_WEIGHT + role.fuzzy_boost()
}

fn candidate_groups(normalized: &str) -> [LabelQuery<'_>; 3] {
    [
        LabelQuery {
            text: normalized,
            kind: MatchKind::Prefix,
            roles: Some(PREFIX_ROLES),
            limit: 5,
        },
        LabelQuery {
            text: normalized,
            kind: MatchKind::Contains,
            roles: Some(CONTAINS_ROLES),
            limit: 10,
        },
        LabelQuery {
            text: normalized,
            kind: MatchKind::AnyToken,
            roles: Some(TOKEN_ROLES),
            limit: 15,
        },
    ]
}

/// Rank label candidates for `normalized`. Best first.
///
/// Ordering: score descending, then shorter label, then label text, then
/// concept id, then match kind. Fully deterministic.
pub fn search(taxonomy: &dyn TaxonomyProvider, normalized: &str) -> Vec<FuzzyHit> {
    let exact = taxonomy.search_labels(&LabelQuery {
        text: normalized,
        kind: MatchKind::Exact,
        roles: None,
        limit: 1,
    });

    let candidates: Vec<LabelMatch> = if exact.is_empty() {
        candidate_groups(normalized)
            .iter()
            .flat_map(|query| taxonomy.search_labels(query))
            .collect()
    } else {
        exact
    };

    let mut hits: Vec<FuzzyHit> = candidates
        .into_iter()
        .map(|label| {
            let similarity = strsim::normalized_levenshtein(normalized, &label.normalized);
            let score = blended_score(label.kind, similarity, &label.role);
            FuzzyHit {
                label,
                similarity,
                score,
            }
        })
        .collect();
    hits.sort_by(rank);
    hits
}

fn rank(a: &FuzzyHit, b: &FuzzyHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            a.label
                .normalized
                .chars()
                .count()
                .cmp(&b.label.normalized.chars().count())
        })
        .then_with(|| a.label.normalized.cmp(&b.label.normalized))
        .then_with(|| a.label.concept.cmp(&b.label.concept))
        .then_with(|| a.label.kind.cmp(&b.label.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exact_standard_label_scores_one_hundred() {
        assert_relative_eq!(
            blended_score(MatchKind::Exact, 1.0, &LabelRole::Standard),
            100.0
        );
        assert_relative_eq!(
            blended_score(MatchKind::AnyToken, 0.0, &LabelRole::Other("x".into())),
            35.0
        );
    }
}
