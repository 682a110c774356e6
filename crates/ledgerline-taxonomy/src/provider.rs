//! Read interface consumed by the resolver and aggregator.

use crate::concept::{CalculationChild, Concept, ConceptId, LabelRole};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// How a label candidate must relate to the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    Contains,
    /// Label contains any query word longer than two characters.
    AnyToken,
}

impl MatchKind {
    /// Base score fed into the fuzzy blend.
    pub fn base_score(self) -> f64 {
        match self {
            MatchKind::Exact => 100.0,
            MatchKind::Prefix => 90.0,
            MatchKind::Contains => 70.0,
            MatchKind::AnyToken => 50.0,
        }
    }
}

/// A label search request. `text` must already be normalized.
#[derive(Debug, Clone)]
pub struct LabelQuery<'a> {
    pub text: &'a str,
    pub kind: MatchKind,
    /// `None` means any role.
    pub roles: Option<&'a [LabelRole]>,
    pub limit: usize,
}

/// One label that satisfied a [`LabelQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatch {
    pub concept: ConceptId,
    /// Label text as published.
    pub text: String,
    pub normalized: String,
    pub role: LabelRole,
    pub kind: MatchKind,
}

/// Query words used by [`MatchKind::AnyToken`].
pub fn query_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// Read-only view of a loaded taxonomy.
///
/// Implementations must be immutable after construction; there is no
/// mutation path on this trait.
pub trait TaxonomyProvider: Send + Sync {
    fn concept(&self, id: &ConceptId) -> Option<&Concept>;

    fn contains(&self, id: &ConceptId) -> bool {
        self.concept(id).is_some()
    }

    /// Presentation parents in load order, deduplicated.
    fn presentation_parents(&self, id: &ConceptId) -> &[ConceptId];

    /// Calculation children ordered by (order, child id).
    fn calculation_children(&self, id: &ConceptId) -> &[CalculationChild];

    fn has_calculation_children(&self, id: &ConceptId) -> bool {
        !self.calculation_children(id).is_empty()
    }

    /// Curated alias lookup on normalized text.
    fn alias(&self, normalized: &str) -> Option<&ConceptId>;

    /// Standard-label lookup on normalized text.
    fn exact_label(&self, normalized: &str) -> Option<&ConceptId>;

    /// Label candidates, shortest first, ties by text then concept id.
    fn search_labels(&self, query: &LabelQuery<'_>) -> Vec<LabelMatch>;

    /// Concepts whose lowercase local name contains, or is contained in, the
    /// normalized text. Ordered by concept id.
    fn local_name_candidates(&self, normalized: &str) -> Vec<ConceptId>;

    /// Every concept reachable through calculation children, excluding `id`.
    fn all_descendants(&self, id: &ConceptId) -> BTreeSet<ConceptId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&ConceptId> = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for child in self.calculation_children(current) {
                if child.child != *id && seen.insert(child.child.clone()) {
                    queue.push_back(&child.child);
                }
            }
        }
        seen
    }
}
