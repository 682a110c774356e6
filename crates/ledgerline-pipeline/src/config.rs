//! Pipeline configuration, layered over documented defaults.

use crate::metrics::{default_metrics, MetricDefinition};
use crate::PipelineError;
use ledgerline_aggregate::{default_buckets, AggregateConfig, BucketDefinition};
use ledgerline_confidence::BlockingPolicy;
use ledgerline_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Session id used in node and edge ids; random when absent.
    pub session: Option<String>,
    /// Free-text source recorded in the lineage metadata.
    pub source: Option<String>,
    pub resolver: ResolverConfig,
    pub aggregate: AggregateConfig,
    pub buckets: Vec<BucketDefinition>,
    pub metrics: Vec<MetricDefinition>,
    pub blocking: BlockingPolicy,
    /// Models to issue verdicts for.
    pub models: Vec<String>,
    /// Caller-supplied confidences for inputs the pipeline cannot derive,
    /// keyed by the blocking input name (e.g. `WACC`).
    pub assumptions: BTreeMap<String, f64>,
    /// Mapping confidence below which a row is reported as low quality.
    pub low_confidence_threshold: f64,
    /// Relative tolerance for the revenue calculation check.
    pub revenue_check_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            session: None,
            source: None,
            resolver: ResolverConfig::default(),
            aggregate: AggregateConfig::default(),
            buckets: default_buckets(),
            metrics: default_metrics(),
            blocking: BlockingPolicy::default(),
            models: vec!["DCF".to_string(), "LBO".to_string(), "COMPS".to_string()],
            assumptions: BTreeMap::new(),
            low_confidence_threshold: 0.6,
            revenue_check_tolerance: 0.01,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Bucket and metric names must be unique, and every metric term must
    /// name a bucket or an earlier metric.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut known = BTreeSet::new();
        for bucket in &self.buckets {
            if !known.insert(bucket.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate bucket name: {}",
                    bucket.name
                )));
            }
        }
        for metric in &self.metrics {
            for term in &metric.terms {
                if !known.contains(term.input.as_str()) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "metric {} uses unknown input {}",
                        metric.name, term.input
                    )));
                }
            }
            if !known.insert(metric.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate metric name: {}",
                    metric.name
                )));
            }
        }
        Ok(())
    }
}
