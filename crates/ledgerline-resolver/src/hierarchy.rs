//! Hierarchy fallback: climb presentation parents to a safe aggregation root.

use ledgerline_taxonomy::{ConceptId, TaxonomyProvider};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeParent {
    pub parent: ConceptId,
    pub depth: usize,
    /// Start concept first, safe parent last.
    pub path: Vec<ConceptId>,
}

impl SafeParent {
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ConceptId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Breadth-first walk up presentation parents from `start`.
///
/// Stops at the first concept in `safe` other than `start` itself. Levels
/// beyond `max_depth` are never expanded; a visited set guards cycles.
pub fn find_safe_parent(
    taxonomy: &dyn TaxonomyProvider,
    start: &ConceptId,
    safe: &BTreeSet<ConceptId>,
    max_depth: usize,
) -> Option<SafeParent> {
    let mut visited: HashSet<&ConceptId> = HashSet::new();
    let mut queue: VecDeque<(&ConceptId, usize, Vec<&ConceptId>)> = VecDeque::new();
    queue.push_back((start, 0, vec![start]));

    while let Some((current, depth, path)) = queue.pop_front() {
        if depth > max_depth || !visited.insert(current) {
            continue;
        }
        if current != start && safe.contains(current) {
            return Some(SafeParent {
                parent: current.clone(),
                depth,
                path: path.into_iter().cloned().collect(),
            });
        }
        for parent in taxonomy.presentation_parents(current) {
            if !visited.contains(parent) {
                let mut next = path.clone();
                next.push(parent);
                queue.push_back((parent, depth + 1, next));
            }
        }
    }
    None
}
