//! Phase events emitted while a pipeline run progresses.

use crate::checks::CrossCheck;
use ledgerline_confidence::VerdictStatus;
use ledgerline_resolver::ResolutionStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RowsExtracted {
        rows: usize,
    },
    LabelsResolved {
        stats: ResolutionStats,
    },
    PeriodAggregated {
        period: Option<String>,
        buckets_with_data: usize,
        buckets_without_data: usize,
        conflicts: usize,
    },
    MetricsCalculated {
        period: Option<String>,
        calculated: usize,
        skipped: usize,
    },
    ChecksCompleted {
        failed: Vec<CrossCheck>,
        total: usize,
    },
    ModelEvaluated {
        model: String,
        status: VerdictStatus,
    },
}

/// Callback for pipeline events.
pub type PipelineEventHandler = Box<dyn Fn(&PipelineEvent) + Send + Sync>;
