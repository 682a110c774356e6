//! The tiered resolver.

use crate::config::ResolverConfig;
use crate::fuzzy;
use crate::hierarchy::find_safe_parent;
use crate::resolution::{Candidate, Resolution, ResolutionDetail};
use crate::stats::{ResolutionStats, TierCounters};
use ledgerline_confidence::fuzzy_confidence;
use ledgerline_taxonomy::{normalize_label, OverrideProvider, TaxonomyProvider};
use rayon::prelude::*;

/// Fuzzy runners-up kept on a result for audit.
const MAX_ALTERNATIVES: usize = 3;

/// Resolves labels against one immutable taxonomy and an optional override
/// layer. Shareable across threads; only the tier counters change.
pub struct Resolver<'a> {
    taxonomy: &'a dyn TaxonomyProvider,
    overrides: Option<&'a dyn OverrideProvider>,
    config: ResolverConfig,
    counters: TierCounters,
}

impl<'a> Resolver<'a> {
    pub fn new(taxonomy: &'a dyn TaxonomyProvider, config: ResolverConfig) -> Self {
        Self {
            taxonomy,
            overrides: None,
            config,
            counters: TierCounters::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: &'a dyn OverrideProvider) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn stats(&self) -> ResolutionStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    /// Resolve one label. Never fails: misses end in an `Unmapped` result.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let resolution = self.resolve_uncounted(raw);
        self.counters.record(resolution.tier());
        tracing::debug!(
            input = raw,
            tier = resolution.tier().ordinal(),
            concept = resolution.concept.as_ref().map(|c| c.as_str()).unwrap_or("-"),
            confidence = %resolution.confidence,
            "resolved label"
        );
        resolution
    }

    /// Resolve many labels in parallel. Output order matches input order.
    pub fn resolve_batch<S>(&self, labels: &[S]) -> Vec<Resolution>
    where
        S: AsRef<str> + Sync,
    {
        labels.par_iter().map(|l| self.resolve(l.as_ref())).collect()
    }

    fn resolve_uncounted(&self, raw: &str) -> Resolution {
        let normalized = normalize_label(raw);
        if normalized.is_empty() {
            return Resolution::unmapped(raw, normalized);
        }

        // Tier 0
        if let Some(concept) = self
            .overrides
            .and_then(|o| o.lookup(&normalized))
            .filter(|c| self.taxonomy.contains(c))
        {
            return Resolution::new(raw, normalized, Some(concept), ResolutionDetail::Override);
        }

        // Tier 1
        if let Some(concept) = self.taxonomy.alias(&normalized) {
            let concept = concept.clone();
            return Resolution::new(raw, normalized, Some(concept), ResolutionDetail::Alias);
        }

        // Tier 2
        if let Some(concept) = self.taxonomy.exact_label(&normalized) {
            let concept = concept.clone();
            return Resolution::new(raw, normalized, Some(concept), ResolutionDetail::ExactLabel);
        }

        // Tier 2.5
        if normalized.chars().count() >= self.config.fuzzy_min_len {
            if let Some(resolution) = self.try_fuzzy(raw, &normalized) {
                return resolution;
            }
        }

        // Tier 3
        for rule in &self.config.keyword_rules {
            let Some(pattern) = rule.matches(&normalized) else {
                continue;
            };
            if !self.taxonomy.contains(&rule.concept) {
                continue;
            }
            let detail = ResolutionDetail::Keyword {
                rule: rule.name.clone(),
                pattern: pattern.to_string(),
            };
            return Resolution::new(raw, normalized, Some(rule.concept.clone()), detail);
        }

        // Tier 4
        if self.config.safe_mode {
            for candidate in self.taxonomy.local_name_candidates(&normalized) {
                if let Some(safe_parent) = find_safe_parent(
                    self.taxonomy,
                    &candidate,
                    &self.config.safe_parents,
                    self.config.max_hierarchy_depth,
                ) {
                    let concept = safe_parent.parent.clone();
                    let detail = ResolutionDetail::Hierarchy {
                        matched: candidate,
                        safe_parent,
                    };
                    return Resolution::new(raw, normalized, Some(concept), detail);
                }
            }
        }

        Resolution::unmapped(raw, normalized)
    }

    fn try_fuzzy(&self, raw: &str, normalized: &str) -> Option<Resolution> {
        let mut hits = fuzzy::search(self.taxonomy, normalized).into_iter();
        let best = hits.next()?;

        let mut alternatives: Vec<Candidate> = Vec::new();
        for hit in hits {
            if alternatives.len() == MAX_ALTERNATIVES {
                break;
            }
            if hit.label.concept == best.label.concept
                || alternatives.iter().any(|a| a.concept == hit.label.concept)
            {
                continue;
            }
            alternatives.push(Candidate {
                concept: hit.label.concept.clone(),
                method: format!("fuzzy {} match on \"{}\"", hit.label.role.as_str(), hit.label.text),
                confidence: fuzzy_confidence(hit.score),
            });
        }

        let concept = best.label.concept.clone();
        let detail = ResolutionDetail::Fuzzy {
            matched_text: best.label.text,
            role: best.label.role,
            match_kind: best.label.kind,
            similarity: best.similarity,
            score: best.score,
        };
        let mut resolution = Resolution::new(raw, normalized.to_string(), Some(concept), detail);
        resolution.alternatives = alternatives;
        Some(resolution)
    }
}
