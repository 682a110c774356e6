//! Run results: the lineage graph plus everything derived alongside it.

use crate::checks::CrossCheck;
use ledgerline_aggregate::BucketOutcome;
use ledgerline_confidence::{BlockingVerdict, Confidence, VerdictStatus};
use ledgerline_lineage::{DataQualitySummary, GraphStatistics, LineageGraph, NodeId, ValidationReport};
use ledgerline_resolver::{Resolution, ResolutionStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub period: Option<String>,
    pub bucket: String,
    pub label: String,
    /// `None` when the bucket had no data for the period.
    pub node: Option<NodeId>,
    pub confidence: Confidence,
    pub outcome: BucketOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub period: Option<String>,
    pub name: String,
    pub label: String,
    pub node: NodeId,
    pub value: f64,
    pub confidence: Confidence,
    pub formula: String,
    pub inputs: BTreeMap<String, f64>,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub graph: LineageGraph,
    /// One per input row, in input order.
    pub resolutions: Vec<Resolution>,
    pub resolution_stats: ResolutionStats,
    pub buckets: Vec<BucketRecord>,
    pub metrics: Vec<MetricRecord>,
    pub checks: Vec<CrossCheck>,
    /// Confidence per blocking input name, lowest across periods.
    pub model_inputs: BTreeMap<String, Option<Confidence>>,
    pub verdicts: Vec<BlockingVerdict>,
    pub validation: ValidationReport,
    pub quality: DataQualitySummary,
}

impl PipelineReport {
    pub fn bucket(&self, period: Option<&str>, name: &str) -> Option<&BucketRecord> {
        self.buckets
            .iter()
            .find(|b| b.period.as_deref() == period && b.bucket == name)
    }

    pub fn metric(&self, period: Option<&str>, name: &str) -> Option<&MetricRecord> {
        self.metrics
            .iter()
            .find(|m| m.period.as_deref() == period && m.name == name)
    }

    pub fn verdict(&self, model: &str) -> Option<&BlockingVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.model.eq_ignore_ascii_case(model))
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            session: self.graph.metadata().session_id.clone(),
            rows: self.resolutions.len(),
            resolution_stats: self.resolution_stats.clone(),
            graph: self.graph.statistics(),
            graph_valid: self.validation.is_valid(),
            violations: self.validation.violations.len(),
            failed_checks: self.checks.iter().filter(|c| !c.valid).count(),
            verdicts: self
                .verdicts
                .iter()
                .map(|v| (v.model.clone(), v.status))
                .collect(),
            quality: self.quality.clone(),
        }
    }
}

/// Serializable digest of a run, for CLI output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub session: String,
    pub rows: usize,
    pub resolution_stats: ResolutionStats,
    pub graph: GraphStatistics,
    pub graph_valid: bool,
    pub violations: usize,
    pub failed_checks: usize,
    pub verdicts: BTreeMap<String, VerdictStatus>,
    pub quality: DataQualitySummary,
}
