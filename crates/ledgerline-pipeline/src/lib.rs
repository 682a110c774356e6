//! Ledgerline Pipeline: spreadsheet rows to audited metrics
//!
//! ```text
//!  RawRow ─► SourceCell ─► Extracted ─► Mapped ─┬─► Aggregated (per bucket, per period)
//!                                   (resolver)  │        │
//!                                               │        ▼
//!                                               │   Calculated (derived metrics)
//!                                               │        │
//!                                               └─► cross checks     model verdicts
//! ```
//!
//! Resolution runs in parallel against the immutable taxonomy; the lineage
//! graph is assembled by a single collector in input order, so a run with a
//! fixed session id is fully reproducible.

pub mod checks;
pub mod config;
pub mod events;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod row;

pub use checks::{cross_checks, CheckKind, CrossCheck};
pub use config::PipelineConfig;
pub use events::{PipelineEvent, PipelineEventHandler};
pub use metrics::{default_metrics, MetricDefinition, MetricEvaluation, MetricTerm, PeriodInput};
pub use pipeline::Pipeline;
pub use report::{BucketRecord, MetricRecord, PipelineReport, RunSummary};
pub use row::{a1_reference, load_rows, rows_from_json, RawRow};

use ledgerline_lineage::LineageError;
use ledgerline_taxonomy::TaxonomyError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Lineage error: {0}")]
    Lineage(#[from] LineageError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
