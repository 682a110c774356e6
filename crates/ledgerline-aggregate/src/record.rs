//! Emit bucket outcomes into the lineage graph as Aggregation steps.

use crate::config::BucketDefinition;
use crate::recovery::BucketOutcome;
use ledgerline_lineage::{AggregationIds, AggregationStep, LineageBuilder, LineageError, NodeId};
use ledgerline_taxonomy::ConceptId;
use std::collections::BTreeMap;

/// Append an Aggregated node for `outcome`.
///
/// `sources` maps each concept to the Mapped nodes carrying its values for
/// the period. Returns `None` when the outcome has no data or none of its
/// concepts has a node.
pub fn record_bucket(
    builder: &mut LineageBuilder,
    bucket: &BucketDefinition,
    period: Option<&str>,
    outcome: &BucketOutcome,
    sources: &BTreeMap<ConceptId, Vec<NodeId>>,
) -> Result<Option<AggregationIds>, LineageError> {
    let result = &outcome.result;
    let Some(strategy) = result.strategy else {
        return Ok(None);
    };

    let nodes_for = |concepts: &[ConceptId]| -> Vec<NodeId> {
        concepts
            .iter()
            .filter_map(|c| sources.get(c))
            .flatten()
            .cloned()
            .collect()
    };
    let used = nodes_for(&result.used);
    if used.is_empty() {
        tracing::warn!(bucket = %bucket.name, "aggregation has no lineage sources");
        return Ok(None);
    }

    let mut notes = Vec::new();
    if let Some(note) = result.conflict_note() {
        notes.push(note);
    }
    if outcome.attempt > 1 {
        notes.push(outcome.recovery.explanation.clone());
    }

    let ids = builder.add_aggregation(AggregationStep {
        used,
        excluded: nodes_for(&result.excluded),
        concept: bucket.primary().cloned(),
        label: Some(bucket.label.clone()),
        period: period.map(str::to_string),
        value: Some(result.value),
        strategy,
        confidence: outcome.confidence().confidence,
        condition: (!notes.is_empty()).then(|| notes.join("; ")),
    })?;
    Ok(Some(ids))
}
