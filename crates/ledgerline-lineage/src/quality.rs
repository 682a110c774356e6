//! Confidence breakdowns and data-quality summaries for audit output.

use crate::graph::{LineageGraph, TraceOptions};
use crate::model::{EdgeId, EdgeKind, NodeId, NodeKind};
use crate::LineageError;
use ledgerline_confidence::Confidence;
use ledgerline_taxonomy::ConceptId;
use serde::{Deserialize, Serialize};

/// One producing edge and the confidences that flowed through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContribution {
    pub edge: EdgeId,
    pub kind: EdgeKind,
    pub method: String,
    pub confidence: Confidence,
    pub target: NodeId,
    pub sources: Vec<(NodeId, Confidence)>,
}

/// Why a node has the confidence it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub node: NodeId,
    pub confidence: Confidence,
    /// Active producing edges of the node and its ancestors, nearest first.
    pub steps: Vec<StepContribution>,
    pub weakest_ancestor: Option<(NodeId, Confidence)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowConfidenceItem {
    pub node: NodeId,
    pub label: Option<String>,
    pub concept: Option<ConceptId>,
    pub confidence: Confidence,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualitySummary {
    pub mapped_nodes: usize,
    pub mapped_with_concept: usize,
    /// Share of mapped nodes that found a concept, in `[0, 1]`.
    pub coverage: f64,
    pub average_mapping_confidence: Option<f64>,
    pub low_confidence: Vec<LowConfidenceItem>,
    pub unmapped_labels: Vec<String>,
}

impl LineageGraph {
    pub fn confidence_breakdown(&self, id: &NodeId) -> Result<ConfidenceBreakdown, LineageError> {
        let node = self.get_node(id)?;
        let ancestors = self.trace_backward(id, TraceOptions::default())?;

        let mut steps = Vec::new();
        for subject in std::iter::once(node).chain(ancestors.iter().copied()) {
            for edge in self.incoming_edges(&subject.id, false)? {
                let sources = edge
                    .sources
                    .iter()
                    .filter_map(|s| self.get_node(s).ok())
                    .map(|s| (s.id.clone(), s.confidence))
                    .collect();
                steps.push(StepContribution {
                    edge: edge.id.clone(),
                    kind: edge.kind,
                    method: edge.method.clone(),
                    confidence: edge.confidence,
                    target: subject.id.clone(),
                    sources,
                });
            }
        }

        let weakest_ancestor = ancestors
            .iter()
            .min_by(|a, b| a.confidence.value().total_cmp(&b.confidence.value()))
            .map(|n| (n.id.clone(), n.confidence));

        Ok(ConfidenceBreakdown {
            node: id.clone(),
            confidence: node.confidence,
            steps,
            weakest_ancestor,
        })
    }

    /// Mapping coverage and the mappings an analyst should review.
    pub fn data_quality(&self, threshold: Confidence) -> DataQualitySummary {
        let mapped = self.query_nodes_by_kind(NodeKind::Mapped);
        let with_concept = mapped.iter().filter(|n| n.concept.is_some()).count();
        let unmapped_labels = mapped
            .iter()
            .filter(|n| n.concept.is_none())
            .map(|n| n.display_name())
            .collect();

        let mut total = 0.0;
        let mut count = 0usize;
        for (_, edge) in self.active_mappings() {
            total += edge.confidence.value();
            count += 1;
        }

        let low_confidence = self
            .query_low_confidence_mappings(threshold)
            .into_iter()
            .map(|(node, edge)| LowConfidenceItem {
                node: node.id.clone(),
                label: node.label.clone(),
                concept: node.concept.clone(),
                confidence: edge.confidence,
                method: edge.method.clone(),
            })
            .collect();

        DataQualitySummary {
            mapped_nodes: mapped.len(),
            mapped_with_concept: with_concept,
            coverage: if mapped.is_empty() {
                0.0
            } else {
                with_concept as f64 / mapped.len() as f64
            },
            average_mapping_confidence: (count > 0).then(|| total / count as f64),
            low_confidence,
            unmapped_labels,
        }
    }
}
