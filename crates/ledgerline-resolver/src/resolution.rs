//! Resolution results: a common envelope plus per-tier detail.

use crate::hierarchy::SafeParent;
use ledgerline_confidence::{mapping_confidence, Confidence, MappingEvidence, ResolutionTier};
use ledgerline_taxonomy::{ConceptId, LabelRole, MatchKind};
use serde::{Deserialize, Serialize};

/// What the winning tier observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum ResolutionDetail {
    Override,
    Alias,
    ExactLabel,
    Fuzzy {
        matched_text: String,
        role: LabelRole,
        match_kind: MatchKind,
        similarity: f64,
        score: f64,
    },
    Keyword {
        rule: String,
        pattern: String,
    },
    Hierarchy {
        /// Concept whose local name resembled the input.
        matched: ConceptId,
        safe_parent: SafeParent,
    },
    Unmapped,
}

impl ResolutionDetail {
    pub fn evidence(&self) -> MappingEvidence {
        match self {
            ResolutionDetail::Override => MappingEvidence::Override,
            ResolutionDetail::Alias => MappingEvidence::Alias,
            ResolutionDetail::ExactLabel => MappingEvidence::ExactLabel,
            ResolutionDetail::Fuzzy { score, .. } => MappingEvidence::Fuzzy { score: *score },
            ResolutionDetail::Keyword { .. } => MappingEvidence::Keyword,
            ResolutionDetail::Hierarchy { safe_parent, .. } => MappingEvidence::Hierarchy {
                depth: safe_parent.depth,
            },
            ResolutionDetail::Unmapped => MappingEvidence::Unmapped,
        }
    }

    pub fn tier(&self) -> ResolutionTier {
        self.evidence().tier()
    }

    /// Method string recorded on lineage edges.
    pub fn method(&self) -> String {
        match self {
            ResolutionDetail::Override => "Override Memory (user override)".to_string(),
            ResolutionDetail::Alias => "Explicit Alias".to_string(),
            ResolutionDetail::ExactLabel => "Exact Label (standard)".to_string(),
            ResolutionDetail::Fuzzy { role, score, .. } => {
                format!("Fuzzy Taxonomy ({}, score={:.0})", role.as_str(), score.floor())
            }
            ResolutionDetail::Keyword { rule, .. } => format!("Keyword Fallback ({rule})"),
            ResolutionDetail::Hierarchy { safe_parent, .. } => {
                format!("Safe Parent Fallback (depth={})", safe_parent.depth)
            }
            ResolutionDetail::Unmapped => "Unmapped".to_string(),
        }
    }
}

/// A runner-up the resolver saw but did not pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub concept: ConceptId,
    pub method: String,
    pub confidence: Confidence,
}

/// Outcome of resolving one label.
///
/// `found` and `method` are fixed at construction from `concept` and
/// `detail` so the serialized record reads without the detail enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub input: String,
    pub normalized: String,
    pub found: bool,
    pub concept: Option<ConceptId>,
    pub method: String,
    pub confidence: Confidence,
    pub explanation: String,
    pub detail: ResolutionDetail,
    #[serde(default)]
    pub alternatives: Vec<Candidate>,
}

impl Resolution {
    pub(crate) fn new(
        input: &str,
        normalized: String,
        concept: Option<ConceptId>,
        detail: ResolutionDetail,
    ) -> Self {
        let scored = mapping_confidence(&detail.evidence());
        Self {
            input: input.to_string(),
            normalized,
            found: concept.is_some(),
            concept,
            method: detail.method(),
            confidence: scored.confidence,
            explanation: scored.explanation,
            detail,
            alternatives: Vec::new(),
        }
    }

    pub(crate) fn unmapped(input: &str, normalized: String) -> Self {
        Self::new(input, normalized, None, ResolutionDetail::Unmapped)
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn tier(&self) -> ResolutionTier {
        self.detail.tier()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The hierarchy path, for tier-4 results only.
    pub fn audit_path(&self) -> Option<&[ConceptId]> {
        match &self.detail {
            ResolutionDetail::Hierarchy { safe_parent, .. } => Some(&safe_parent.path),
            _ => None,
        }
    }
}
