//! Nodes and edges of the lineage graph.

use ledgerline_confidence::{AggregationStrategy, Confidence, ResolutionTier};
use ledgerline_taxonomy::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(NodeId);
string_id!(EdgeId);

// ============================================================================
// Nodes
// ============================================================================

/// Pipeline stage a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    SourceCell,
    Extracted,
    Mapped,
    Aggregated,
    Calculated,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::SourceCell,
        NodeKind::Extracted,
        NodeKind::Mapped,
        NodeKind::Aggregated,
        NodeKind::Calculated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::SourceCell => "source_cell",
            NodeKind::Extracted => "extracted",
            NodeKind::Mapped => "mapped",
            NodeKind::Aggregated => "aggregated",
            NodeKind::Calculated => "calculated",
        }
    }

    /// Ancestor kinds of which at least one must be present.
    pub fn required_ancestors(self) -> &'static [NodeKind] {
        match self {
            NodeKind::SourceCell => &[],
            NodeKind::Extracted => &[NodeKind::SourceCell],
            NodeKind::Mapped => &[NodeKind::Extracted],
            NodeKind::Aggregated => &[NodeKind::Mapped],
            NodeKind::Calculated => &[NodeKind::Aggregated, NodeKind::Calculated],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spreadsheet coordinates of a source cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
    /// A1-style reference, e.g. `C6`.
    pub cell_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub concept: Option<ConceptId>,
    /// `None` is "no data", never zero.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub period: Option<String>,
    pub confidence: Confidence,
    #[serde(default)]
    pub cell: Option<CellRef>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LineageNode {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            concept: None,
            value: None,
            period: None,
            confidence: Confidence::ONE,
            cell: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_concept(mut self, concept: impl Into<ConceptId>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Label, then concept, then id.
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.concept.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| self.id.to_string())
    }
}

// ============================================================================
// Edges
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Extraction,
    Mapping,
    Aggregation,
    Calculation,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Extraction => "extraction",
            EdgeKind::Mapping => "mapping",
            EdgeKind::Aggregation => "aggregation",
            EdgeKind::Calculation => "calculation",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate the resolver considered but did not pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub concept: ConceptId,
    pub method: String,
    pub confidence: Confidence,
}

/// A transformation from one or more source nodes to one target node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub sources: Vec<NodeId>,
    pub target: NodeId,
    pub method: String,
    pub confidence: Confidence,
    /// Inactive edges record rejected or superseded alternatives.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub tier: Option<ResolutionTier>,
    #[serde(default)]
    pub strategy: Option<AggregationStrategy>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub formula_inputs: BTreeMap<String, f64>,
    #[serde(default)]
    pub excluded_sources: Vec<NodeId>,
    #[serde(default)]
    pub superseded_by: Option<EdgeId>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

fn default_active() -> bool {
    true
}

impl LineageEdge {
    pub fn new(
        id: impl Into<EdgeId>,
        kind: EdgeKind,
        sources: Vec<NodeId>,
        target: impl Into<NodeId>,
        method: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            sources,
            target: target.into(),
            method: method.into(),
            confidence,
            active: true,
            condition: None,
            tier: None,
            strategy: None,
            formula: None,
            formula_inputs: BTreeMap::new(),
            excluded_sources: Vec::new(),
            superseded_by: None,
            alternatives: Vec::new(),
        }
    }

    pub fn with_tier(mut self, tier: ResolutionTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_strategy(mut self, strategy: AggregationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn inactive(mut self, condition: impl Into<String>) -> Self {
        self.active = false;
        self.condition = Some(condition.into());
        self
    }
}
