//! Stage helpers that append nodes and edges with propagated confidence.
//!
//! Each helper adds exactly one target node plus the edge(s) that produce
//! it, so the graph is never observed with a node lacking its provenance.

use crate::graph::{GraphMetadata, LineageGraph};
use crate::model::{
    Alternative, CellRef, EdgeId, EdgeKind, LineageEdge, LineageNode, NodeId, NodeKind,
};
use crate::LineageError;
use ledgerline_confidence::{propagate, AggregationStrategy, Confidence, FormulaKind, ResolutionTier};
use ledgerline_taxonomy::ConceptId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub const EXTRACTION_METHOD: &str = "spreadsheet_extraction";
pub const EXCLUDED_CONDITION: &str = "excluded to prevent double counting";

/// Session-scoped id source: `{session}:{prefix}:{counter:08}`.
#[derive(Debug)]
pub struct IdGenerator {
    session: String,
    nodes: AtomicU64,
    edges: AtomicU64,
}

impl IdGenerator {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            nodes: AtomicU64::new(0),
            edges: AtomicU64::new(0),
        }
    }

    /// A generator with a random session id.
    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn node(&self, prefix: &str) -> NodeId {
        let n = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        NodeId::new(format!("{}:{}:{:08}", self.session, prefix, n))
    }

    pub fn edge(&self, prefix: &str) -> EdgeId {
        let n = self.edges.fetch_add(1, Ordering::Relaxed) + 1;
        EdgeId::new(format!("{}:{}:{:08}", self.session, prefix, n))
    }
}

// ============================================================================
// Stage inputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct MappingStep {
    pub concept: Option<ConceptId>,
    pub tier: ResolutionTier,
    pub method: String,
    pub confidence: Confidence,
    pub alternatives: Vec<Alternative>,
    /// Extra audit fields copied onto the mapped node.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct AggregationStep {
    pub used: Vec<NodeId>,
    pub excluded: Vec<NodeId>,
    pub concept: Option<ConceptId>,
    pub label: Option<String>,
    pub period: Option<String>,
    pub value: Option<f64>,
    pub strategy: AggregationStrategy,
    /// Strategy confidence, conflict penalty already applied.
    pub confidence: Confidence,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CalculationStep {
    pub inputs: Vec<NodeId>,
    pub label: String,
    pub period: Option<String>,
    pub value: Option<f64>,
    pub formula: String,
    pub formula_inputs: BTreeMap<String, f64>,
    pub transform: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationIds {
    pub node: NodeId,
    pub edge: EdgeId,
    /// Inactive edge recording the excluded inputs, if any.
    pub excluded_edge: Option<EdgeId>,
}

// ============================================================================
// Builder
// ============================================================================

pub struct LineageBuilder {
    graph: LineageGraph,
    ids: IdGenerator,
}

impl LineageBuilder {
    pub fn new(ids: IdGenerator) -> Self {
        let graph = LineageGraph::new(GraphMetadata::new(ids.session()));
        Self { graph, ids }
    }

    pub fn graph(&self) -> &LineageGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut LineageGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> LineageGraph {
        self.graph
    }

    fn confidence_of(&self, ids: &[NodeId]) -> Result<Vec<Option<Confidence>>, LineageError> {
        ids.iter()
            .map(|id| self.graph.get_node(id).map(|n| Some(n.confidence)))
            .collect()
    }

    pub fn add_source_cell(
        &mut self,
        cell: CellRef,
        label: Option<String>,
        value: Option<f64>,
    ) -> Result<NodeId, LineageError> {
        let id = self.ids.node("cell");
        let mut node = LineageNode::new(id.clone(), NodeKind::SourceCell);
        node.label = label;
        node.value = value;
        node.cell = Some(cell);
        self.graph.add_node(node)?;
        Ok(id)
    }

    pub fn add_extraction(
        &mut self,
        cell: &NodeId,
        label: impl Into<String>,
        value: Option<f64>,
        period: Option<String>,
    ) -> Result<(NodeId, EdgeId), LineageError> {
        let inputs = self.confidence_of(std::slice::from_ref(cell))?;
        let propagated = propagate(&inputs, Confidence::ONE, None);

        let id = self.ids.node("extracted");
        let mut node = LineageNode::new(id.clone(), NodeKind::Extracted)
            .with_label(label)
            .with_confidence(propagated.confidence);
        node.value = value;
        node.period = period;
        self.graph.add_node(node)?;

        let edge_id = self.ids.edge("extract");
        self.graph.add_edge(LineageEdge::new(
            edge_id.clone(),
            EdgeKind::Extraction,
            vec![cell.clone()],
            id.clone(),
            EXTRACTION_METHOD,
            Confidence::ONE,
        ))?;
        Ok((id, edge_id))
    }

    /// Record a resolution. The mapped node copies label, value and period
    /// from the extracted node.
    pub fn add_mapping(
        &mut self,
        extracted: &NodeId,
        step: MappingStep,
    ) -> Result<(NodeId, EdgeId), LineageError> {
        let source = self.graph.get_node(extracted)?;
        let propagated = propagate(&[Some(source.confidence)], step.confidence, None);

        let id = self.ids.node("mapped");
        let mut node = LineageNode::new(id.clone(), NodeKind::Mapped)
            .with_confidence(propagated.confidence);
        node.label = source.label.clone();
        node.value = source.value;
        node.period = source.period.clone();
        node.concept = step.concept;
        node.metadata = step.metadata;
        node.metadata
            .insert("explanation".into(), propagated.explanation.into());
        self.graph.add_node(node)?;

        let edge_id = self.ids.edge("map");
        let mut edge = LineageEdge::new(
            edge_id.clone(),
            EdgeKind::Mapping,
            vec![extracted.clone()],
            id.clone(),
            step.method,
            step.confidence,
        )
        .with_tier(step.tier);
        edge.alternatives = step.alternatives;
        self.graph.add_edge(edge)?;
        Ok((id, edge_id))
    }

    pub fn add_aggregation(&mut self, step: AggregationStep) -> Result<AggregationIds, LineageError> {
        if step.used.is_empty() {
            return Err(LineageError::EmptySources(format!(
                "aggregation of {}",
                step.label.as_deref().unwrap_or("<unlabelled>")
            )));
        }
        let inputs = self.confidence_of(&step.used)?;
        self.confidence_of(&step.excluded)?;
        let propagated = propagate(&inputs, step.confidence, None);

        let id = self.ids.node("agg");
        let mut node = LineageNode::new(id.clone(), NodeKind::Aggregated)
            .with_confidence(propagated.confidence);
        node.concept = step.concept;
        node.label = step.label;
        node.period = step.period;
        node.value = step.value;
        node.metadata
            .insert("explanation".into(), propagated.explanation.into());
        self.graph.add_node(node)?;

        let method = format!("aggregation_{}", step.strategy);
        let edge_id = self.ids.edge("agg");
        let mut edge = LineageEdge::new(
            edge_id.clone(),
            EdgeKind::Aggregation,
            step.used,
            id.clone(),
            method.clone(),
            step.confidence,
        )
        .with_strategy(step.strategy);
        edge.condition = step.condition;
        edge.excluded_sources = step.excluded.clone();
        self.graph.add_edge(edge)?;

        let excluded_edge = if step.excluded.is_empty() {
            None
        } else {
            let excluded_id = self.ids.edge("agg");
            self.graph.add_edge(
                LineageEdge::new(
                    excluded_id.clone(),
                    EdgeKind::Aggregation,
                    step.excluded,
                    id.clone(),
                    method,
                    step.confidence,
                )
                .with_strategy(step.strategy)
                .inactive(EXCLUDED_CONDITION),
            )?;
            Some(excluded_id)
        };

        Ok(AggregationIds {
            node: id,
            edge: edge_id,
            excluded_edge,
        })
    }

    pub fn add_calculation(
        &mut self,
        step: CalculationStep,
    ) -> Result<(NodeId, EdgeId), LineageError> {
        if step.inputs.is_empty() {
            return Err(LineageError::EmptySources(format!("calculation of {}", step.label)));
        }
        let inputs = self.confidence_of(&step.inputs)?;
        let kind = FormulaKind::infer(&step.formula);
        let propagated = propagate(&inputs, step.transform, Some(kind));

        let id = self.ids.node("calc");
        let mut node = LineageNode::new(id.clone(), NodeKind::Calculated)
            .with_label(step.label)
            .with_confidence(propagated.confidence);
        node.period = step.period;
        node.value = step.value;
        node.metadata
            .insert("explanation".into(), propagated.explanation.into());
        node.metadata
            .insert("formula_kind".into(), kind.description().into());
        self.graph.add_node(node)?;

        let edge_id = self.ids.edge("calc");
        let mut edge = LineageEdge::new(
            edge_id.clone(),
            EdgeKind::Calculation,
            step.inputs,
            id.clone(),
            "formula",
            step.transform.scale(kind.complexity_factor()),
        )
        .with_formula(step.formula);
        edge.formula_inputs = step.formula_inputs;
        self.graph.add_edge(edge)?;
        Ok((id, edge_id))
    }
}
