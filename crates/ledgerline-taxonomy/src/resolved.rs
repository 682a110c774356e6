//! `ResolvedTaxonomy`: the immutable, indexed taxonomy built once per run.
//!
//! ```text
//! TaxonomySnapshot ──build──► ResolvedTaxonomy
//!   concepts                    concepts      (BTreeMap, sorted)
//!   labels                      labels        (normalized, searchable)
//!   aliases      ──validate──►  alias_index   (normalized → concept)
//!   presentation ──dedupe────►  parents       (child → [parent])
//!   calculations ──coerce±1──►  children      (parent → [(child, w, order)])
//!                               local_names   (sorted by concept id)
//! ```
//!
//! Everything the build had to drop or repair is listed in the
//! [`BuildReport`] and logged at `warn`.

use crate::concept::{
    normalize_label, AliasEntry, CalculationChild, Concept, ConceptId, LabelRole,
};
use crate::provider::{query_tokens, LabelMatch, LabelQuery, MatchKind, TaxonomyProvider};
use crate::snapshot::TaxonomySnapshot;
use crate::TaxonomyError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct IndexedLabel {
    concept: ConceptId,
    text: String,
    normalized: String,
    role: LabelRole,
}

/// A calculation weight that was not ±1 and got coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedWeight {
    pub parent: ConceptId,
    pub child: ConceptId,
    pub original: f64,
    pub coerced: f64,
}

/// Two aliases that normalize to the same text but name different concepts.
/// The smaller concept id is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasCollision {
    pub alias: String,
    pub kept: ConceptId,
    pub dropped: ConceptId,
}

/// What `ResolvedTaxonomy::build` dropped or repaired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub rejected_aliases: Vec<AliasEntry>,
    pub coerced_weights: Vec<CoercedWeight>,
    pub duplicate_presentation_arcs: usize,
    /// Labels or arcs that named a concept the snapshot does not define.
    pub dangling_references: Vec<String>,
    #[serde(default)]
    pub alias_collisions: Vec<AliasCollision>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.rejected_aliases.is_empty()
            && self.coerced_weights.is_empty()
            && self.duplicate_presentation_arcs == 0
            && self.dangling_references.is_empty()
            && self.alias_collisions.is_empty()
    }
}

/// Indexed, read-only taxonomy shared by reference across workers.
#[derive(Debug, Clone)]
pub struct ResolvedTaxonomy {
    concepts: BTreeMap<ConceptId, Concept>,
    labels: Vec<IndexedLabel>,
    standard_index: HashMap<String, ConceptId>,
    alias_index: HashMap<String, ConceptId>,
    parents: HashMap<ConceptId, Vec<ConceptId>>,
    children: HashMap<ConceptId, Vec<CalculationChild>>,
    local_names: Vec<(String, ConceptId)>,
}

impl ResolvedTaxonomy {
    /// Build all indexes from a snapshot.
    ///
    /// Fails only on structural problems (duplicate concept ids). Bad aliases,
    /// bad weights and dangling references are repaired or dropped and reported.
    pub fn build(snapshot: TaxonomySnapshot) -> Result<(Self, BuildReport), TaxonomyError> {
        let mut report = BuildReport::default();

        let mut concepts = BTreeMap::new();
        for concept in snapshot.concepts {
            if concepts.contains_key(&concept.id) {
                return Err(TaxonomyError::DuplicateConcept(concept.id.to_string()));
            }
            concepts.insert(concept.id.clone(), concept);
        }

        // Labels. Standard-label collisions resolve to the smallest concept id.
        let mut labels = Vec::with_capacity(snapshot.labels.len());
        let mut standard_index: HashMap<String, ConceptId> = HashMap::new();
        for label in snapshot.labels {
            if !concepts.contains_key(&label.concept) {
                report
                    .dangling_references
                    .push(format!("label '{}' -> {}", label.text, label.concept));
                continue;
            }
            let normalized = normalize_label(&label.text);
            if normalized.is_empty() {
                continue;
            }
            if label.role == LabelRole::Standard {
                standard_index
                    .entry(normalized.clone())
                    .and_modify(|existing| {
                        if label.concept < *existing {
                            *existing = label.concept.clone();
                        }
                    })
                    .or_insert_with(|| label.concept.clone());
            }
            labels.push(IndexedLabel {
                concept: label.concept,
                text: label.text,
                normalized,
                role: label.role,
            });
        }

        // Aliases naming unknown concepts never participate in resolution.
        let mut alias_index = HashMap::new();
        for entry in snapshot.aliases {
            let normalized = normalize_label(&entry.alias);
            if normalized.is_empty() || !concepts.contains_key(&entry.concept) {
                tracing::warn!(
                    alias = %entry.alias,
                    concept = %entry.concept,
                    "rejecting alias that names an unknown concept"
                );
                report.rejected_aliases.push(entry);
                continue;
            }
            match alias_index.entry(normalized) {
                Entry::Vacant(slot) => {
                    slot.insert(entry.concept);
                }
                Entry::Occupied(slot) if *slot.get() == entry.concept => {}
                Entry::Occupied(mut slot) => {
                    // Same rule as standard labels: the smaller concept id wins.
                    let (kept, dropped) = if entry.concept < *slot.get() {
                        let dropped = slot.insert(entry.concept.clone());
                        (entry.concept, dropped)
                    } else {
                        (slot.get().clone(), entry.concept)
                    };
                    tracing::warn!(
                        alias = %entry.alias,
                        kept = %kept,
                        dropped = %dropped,
                        "alias names two concepts, keeping the smaller id"
                    );
                    report.alias_collisions.push(AliasCollision {
                        alias: entry.alias,
                        kept,
                        dropped,
                    });
                }
            }
        }

        let mut parents: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
        for arc in snapshot.presentation {
            if !concepts.contains_key(&arc.child) || !concepts.contains_key(&arc.parent) {
                report
                    .dangling_references
                    .push(format!("presentation {} -> {}", arc.child, arc.parent));
                continue;
            }
            let list = parents.entry(arc.child).or_default();
            if list.contains(&arc.parent) {
                report.duplicate_presentation_arcs += 1;
            } else {
                list.push(arc.parent);
            }
        }

        let mut children: HashMap<ConceptId, Vec<CalculationChild>> = HashMap::new();
        for arc in snapshot.calculations {
            if !concepts.contains_key(&arc.child) || !concepts.contains_key(&arc.parent) {
                report
                    .dangling_references
                    .push(format!("calculation {} -> {}", arc.parent, arc.child));
                continue;
            }
            let weight = if arc.weight == 1.0 || arc.weight == -1.0 {
                arc.weight
            } else {
                let coerced = if arc.weight < 0.0 { -1.0 } else { 1.0 };
                tracing::warn!(
                    parent = %arc.parent,
                    child = %arc.child,
                    weight = arc.weight,
                    coerced,
                    "calculation weight is not ±1, coercing"
                );
                report.coerced_weights.push(CoercedWeight {
                    parent: arc.parent.clone(),
                    child: arc.child.clone(),
                    original: arc.weight,
                    coerced,
                });
                coerced
            };
            let list = children.entry(arc.parent).or_default();
            if list.iter().any(|c| c.child == arc.child) {
                continue;
            }
            list.push(CalculationChild {
                child: arc.child,
                weight,
                order: if arc.order.is_finite() { arc.order } else { 0.0 },
            });
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| a.child.cmp(&b.child)));
        }

        let local_names = concepts
            .keys()
            .map(|id| (id.local_name().to_lowercase(), id.clone()))
            .filter(|(name, _)| !name.is_empty())
            .collect();

        if !report.dangling_references.is_empty() {
            tracing::warn!(
                count = report.dangling_references.len(),
                "dropped taxonomy references to unknown concepts"
            );
        }
        tracing::debug!(
            concepts = concepts.len(),
            labels = labels.len(),
            aliases = alias_index.len(),
            calculation_parents = children.len(),
            "taxonomy indexed"
        );

        Ok((
            Self {
                concepts,
                labels,
                standard_index,
                alias_index,
                parents,
                children,
                local_names,
            },
            report,
        ))
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn alias_count(&self) -> usize {
        self.alias_index.len()
    }
}

fn label_matches(label: &IndexedLabel, query: &LabelQuery<'_>, tokens: &[&str]) -> bool {
    if let Some(roles) = query.roles {
        if !roles.contains(&label.role) {
            return false;
        }
    }
    match query.kind {
        MatchKind::Exact => label.normalized == query.text,
        MatchKind::Prefix => label.normalized.starts_with(query.text),
        MatchKind::Contains => label.normalized.contains(query.text),
        MatchKind::AnyToken => tokens.iter().any(|t| label.normalized.contains(t)),
    }
}

impl TaxonomyProvider for ResolvedTaxonomy {
    fn concept(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id)
    }

    fn presentation_parents(&self, id: &ConceptId) -> &[ConceptId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn calculation_children(&self, id: &ConceptId) -> &[CalculationChild] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn alias(&self, normalized: &str) -> Option<&ConceptId> {
        self.alias_index.get(normalized)
    }

    fn exact_label(&self, normalized: &str) -> Option<&ConceptId> {
        self.standard_index.get(normalized)
    }

    fn search_labels(&self, query: &LabelQuery<'_>) -> Vec<LabelMatch> {
        if query.text.is_empty() || query.limit == 0 {
            return Vec::new();
        }
        let tokens = query_tokens(query.text);
        if query.kind == MatchKind::AnyToken && tokens.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<&IndexedLabel> = self
            .labels
            .iter()
            .filter(|label| label_matches(label, query, &tokens))
            .collect();
        hits.sort_by(|a, b| {
            a.normalized
                .chars()
                .count()
                .cmp(&b.normalized.chars().count())
                .then_with(|| a.normalized.cmp(&b.normalized))
                .then_with(|| a.concept.cmp(&b.concept))
                .then_with(|| a.role.cmp(&b.role))
        });
        hits.truncate(query.limit);

        hits.into_iter()
            .map(|label| LabelMatch {
                concept: label.concept.clone(),
                text: label.text.clone(),
                normalized: label.normalized.clone(),
                role: label.role.clone(),
                kind: query.kind,
            })
            .collect()
    }

    fn local_name_candidates(&self, normalized: &str) -> Vec<ConceptId> {
        if normalized.is_empty() {
            return Vec::new();
        }
        self.local_names
            .iter()
            .filter(|(name, _)| normalized.contains(name.as_str()) || name.contains(normalized))
            .map(|(_, id)| id.clone())
            .collect()
    }
}
