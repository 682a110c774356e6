//! Ledgerline Lineage: append-only provenance for every reported number
//!
//! ```text
//!  SourceCell ──extraction──► Extracted ──mapping──► Mapped ─┐
//!                                                            │ aggregation
//!                                                            ▼ (inactive edge = excluded)
//!                       Calculated ◄──calculation── Aggregated
//!                           │
//!                           └──calculation──► Calculated ...
//! ```
//!
//! Nodes and edges are only ever added. The single mutation is flipping an
//! edge inactive (deactivate / supersede), which keeps rejected alternatives
//! in the audit trail. Cycles are refused at insertion time, so every graph
//! is a DAG.

pub mod builder;
pub mod document;
pub mod graph;
pub mod model;
pub mod quality;
pub mod validate;

pub use builder::{
    AggregationIds, AggregationStep, CalculationStep, IdGenerator, LineageBuilder, MappingStep,
    EXCLUDED_CONDITION, EXTRACTION_METHOD,
};
pub use document::{LineageDocument, FORMAT_VERSION};
pub use graph::{
    Direction, GraphMetadata, GraphStatistics, LineageGraph, PathStep, TraceOptions,
};
pub use model::{
    Alternative, CellRef, EdgeId, EdgeKind, LineageEdge, LineageNode, NodeId, NodeKind,
};
pub use quality::{ConfidenceBreakdown, DataQualitySummary, LowConfidenceItem, StepContribution};
pub use validate::{target_kind_for, ValidationReport, Violation, ViolationKind};

#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Duplicate edge id: {0}")]
    DuplicateEdge(String),

    #[error("Edge {0} has no source nodes")]
    EmptySources(String),

    #[error("Edge {edge} would create a cycle through {target}")]
    CycleDetected { edge: String, target: String },

    #[error("Edge {0} cannot supersede itself")]
    InvalidSupersede(String),

    #[error("Unsupported lineage format version: {0}")]
    UnsupportedVersion(u32),

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
