//! Structural validation of a lineage graph.
//!
//! Validation never mutates the graph; it reports every violation it finds
//! so an audit can show all problems at once.

use crate::graph::{LineageGraph, TraceOptions};
use crate::model::{EdgeKind, LineageEdge, NodeKind};
use ledgerline_confidence::MONOTONIC_EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A node lacks an ancestor of the kind its stage requires.
    MissingAncestor,
    /// A non-source node has no ancestors at all.
    Orphan,
    EmptyMethod,
    ConfidenceOutOfRange,
    MappingWithoutTier,
    AggregationWithoutStrategy,
    CalculationWithoutFormula,
    /// A node is more confident than one of its active inputs.
    ConfidenceIncrease,
    /// An edge targets a node of the wrong stage.
    TargetKindMismatch,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::MissingAncestor => "missing_ancestor",
            ViolationKind::Orphan => "orphan",
            ViolationKind::EmptyMethod => "empty_method",
            ViolationKind::ConfidenceOutOfRange => "confidence_out_of_range",
            ViolationKind::MappingWithoutTier => "mapping_without_tier",
            ViolationKind::AggregationWithoutStrategy => "aggregation_without_strategy",
            ViolationKind::CalculationWithoutFormula => "calculation_without_formula",
            ViolationKind::ConfidenceIncrease => "confidence_increase",
            ViolationKind::TargetKindMismatch => "target_kind_mismatch",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Node or edge id the violation is about.
    pub subject: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub nodes_checked: usize,
    pub edges_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<ViolationKind, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn offending(&self, kind: ViolationKind) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.subject.as_str())
            .collect()
    }

    fn push(&mut self, kind: ViolationKind, subject: impl fmt::Display, detail: String) {
        self.violations.push(Violation {
            kind,
            subject: subject.to_string(),
            detail,
        });
    }
}

impl LineageGraph {
    /// Check stage ancestry, edge annotations and confidence monotonicity.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport {
            nodes_checked: self.node_count(),
            edges_checked: self.edge_count(),
            violations: Vec::new(),
        };

        for node in self.nodes() {
            if !node.confidence.is_valid() {
                report.push(
                    ViolationKind::ConfidenceOutOfRange,
                    &node.id,
                    format!("node confidence {} outside [0, 1]", node.confidence.value()),
                );
            }

            let required = node.kind.required_ancestors();
            if required.is_empty() {
                continue;
            }
            let ancestors = match self.trace_backward(&node.id, TraceOptions::default()) {
                Ok(ancestors) => ancestors,
                Err(_) => continue,
            };
            if ancestors.is_empty() {
                report.push(
                    ViolationKind::Orphan,
                    &node.id,
                    format!("{} node has no active ancestors", node.kind),
                );
            } else if !ancestors.iter().any(|a| required.contains(&a.kind)) {
                let names: Vec<&str> = required.iter().map(|k| k.as_str()).collect();
                report.push(
                    ViolationKind::MissingAncestor,
                    &node.id,
                    format!("{} node has no {} ancestor", node.kind, names.join(" or ")),
                );
            }
        }

        for edge in self.edges() {
            self.check_edge(edge, &mut report);
        }

        if !report.is_valid() {
            tracing::warn!(
                violations = report.violations.len(),
                "lineage validation found violations"
            );
        }
        report
    }

    fn check_edge(&self, edge: &LineageEdge, report: &mut ValidationReport) {
        if edge.method.trim().is_empty() {
            report.push(ViolationKind::EmptyMethod, &edge.id, "edge method is empty".into());
        }
        if !edge.confidence.is_valid() {
            report.push(
                ViolationKind::ConfidenceOutOfRange,
                &edge.id,
                format!("edge confidence {} outside [0, 1]", edge.confidence.value()),
            );
        }
        match edge.kind {
            EdgeKind::Mapping if edge.tier.is_none() => report.push(
                ViolationKind::MappingWithoutTier,
                &edge.id,
                "mapping edge carries no resolution tier".into(),
            ),
            EdgeKind::Aggregation if edge.strategy.is_none() => report.push(
                ViolationKind::AggregationWithoutStrategy,
                &edge.id,
                "aggregation edge carries no strategy".into(),
            ),
            EdgeKind::Calculation
                if edge.formula.as_deref().map_or(true, |f| f.trim().is_empty())
                    && edge.method.trim().is_empty() =>
            {
                report.push(
                    ViolationKind::CalculationWithoutFormula,
                    &edge.id,
                    "calculation edge carries neither formula nor method".into(),
                )
            }
            _ => {}
        }

        let Ok(target) = self.get_node(&edge.target) else {
            return;
        };
        let expected = target_kind_for(edge.kind);
        if target.kind != expected {
            report.push(
                ViolationKind::TargetKindMismatch,
                &edge.id,
                format!("{} edge targets {} node, expected {}", edge.kind, target.kind, expected),
            );
        }
        if !edge.active {
            return;
        }
        for source in &edge.sources {
            let Ok(source) = self.get_node(source) else {
                continue;
            };
            if target.confidence.value() > source.confidence.value() + MONOTONIC_EPSILON {
                report.push(
                    ViolationKind::ConfidenceIncrease,
                    &edge.id,
                    format!(
                        "{} ({}) is more confident than input {} ({})",
                        target.id, target.confidence, source.id, source.confidence
                    ),
                );
            }
        }
    }
}

/// Node kind produced by an edge of this kind.
pub fn target_kind_for(edge: EdgeKind) -> NodeKind {
    match edge {
        EdgeKind::Extraction => NodeKind::Extracted,
        EdgeKind::Mapping => NodeKind::Mapped,
        EdgeKind::Aggregation => NodeKind::Aggregated,
        EdgeKind::Calculation => NodeKind::Calculated,
    }
}
