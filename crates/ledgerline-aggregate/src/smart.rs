//! Smart Aggregate: pick a reported total or a component sum for one bucket.

use crate::config::AggregateConfig;
use ledgerline_confidence::{aggregation_confidence, AggregationStrategy, Confidence, Scored};
use ledgerline_taxonomy::{ConceptId, TaxonomyProvider};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateMethod {
    TotalLineUsed,
    CalculatedSum,
    ComponentSum,
    NoData,
}

impl AggregateMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateMethod::TotalLineUsed => "TOTAL_LINE_USED",
            AggregateMethod::CalculatedSum => "CALCULATED_SUM",
            AggregateMethod::ComponentSum => "COMPONENT_SUM",
            AggregateMethod::NoData => "NO_DATA",
        }
    }
}

impl fmt::Display for AggregateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one aggregation, with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub value: f64,
    pub method: AggregateMethod,
    /// Concepts whose values make up `value`.
    pub used: Vec<ConceptId>,
    /// Available candidates left out of `value`.
    pub excluded: Vec<ConceptId>,
    /// Children of the chosen total found in the value set.
    pub children_used: Vec<ConceptId>,
    pub reported_total: Option<f64>,
    pub calculated_sum: Option<f64>,
    /// Reported total and children disagree beyond tolerance.
    pub conflict: bool,
    /// `None` only for `NoData`.
    pub strategy: Option<AggregationStrategy>,
}

impl AggregateResult {
    fn no_data() -> Self {
        Self {
            value: 0.0,
            method: AggregateMethod::NoData,
            used: Vec::new(),
            excluded: Vec::new(),
            children_used: Vec::new(),
            reported_total: None,
            calculated_sum: None,
            conflict: false,
            strategy: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.method != AggregateMethod::NoData
    }

    pub fn confidence(&self) -> Scored {
        match self.strategy {
            Some(strategy) => aggregation_confidence(strategy, self.conflict),
            None => Scored::new(Confidence::ZERO, "No Data - no candidate concept had a value"),
        }
    }

    /// Condition text recorded on the lineage edge when the sources disagree.
    pub fn conflict_note(&self) -> Option<String> {
        if !self.conflict {
            return None;
        }
        Some(format!(
            "reported total {} vs calculated sum {}",
            self.reported_total.unwrap_or_default(),
            self.calculated_sum.unwrap_or_default()
        ))
    }
}

/// Aggregate `candidates` for one period.
///
/// Candidates are considered in the order given (duplicates ignored), so
/// the first total in that order is the one compared against its children.
pub fn smart_aggregate(
    taxonomy: &dyn TaxonomyProvider,
    candidates: &[ConceptId],
    values: &BTreeMap<ConceptId, f64>,
    config: &AggregateConfig,
) -> AggregateResult {
    let mut seen = BTreeSet::new();
    let available: Vec<&ConceptId> = candidates
        .iter()
        .filter(|c| values.contains_key(*c) && seen.insert(*c))
        .collect();

    if available.is_empty() {
        return AggregateResult::no_data();
    }

    let result = match available
        .iter()
        .find(|c| taxonomy.has_calculation_children(c))
    {
        Some(total) => from_total(taxonomy, total, &available, values, config),
        None => from_components(taxonomy, &available, values),
    };

    tracing::debug!(
        method = result.method.as_str(),
        value = result.value,
        used = result.used.len(),
        excluded = result.excluded.len(),
        conflict = result.conflict,
        "aggregated bucket"
    );
    result
}

fn excluded_from(available: &[&ConceptId], used: &[ConceptId]) -> Vec<ConceptId> {
    available
        .iter()
        .filter(|c| !used.contains(c))
        .map(|c| (*c).clone())
        .collect()
}

fn from_total(
    taxonomy: &dyn TaxonomyProvider,
    total: &ConceptId,
    available: &[&ConceptId],
    values: &BTreeMap<ConceptId, f64>,
    config: &AggregateConfig,
) -> AggregateResult {
    let reported = values.get(total).copied().unwrap_or_default();

    let mut calculated = 0.0;
    let mut children_used = Vec::new();
    for child in taxonomy.calculation_children(total) {
        if let Some(value) = values.get(&child.child) {
            calculated += value * child.weight;
            children_used.push(child.child.clone());
        }
    }

    let trusted = |strategy, conflict| {
        let used = vec![total.clone()];
        AggregateResult {
            value: reported,
            method: AggregateMethod::TotalLineUsed,
            excluded: excluded_from(available, &used),
            used,
            children_used: children_used.clone(),
            reported_total: Some(reported),
            calculated_sum: Some(calculated),
            conflict,
            strategy: Some(strategy),
        }
    };

    // Nothing to check the total against.
    if children_used.is_empty() {
        let strategy = if available.len() == 1 {
            AggregationStrategy::SingleValue
        } else {
            AggregationStrategy::TotalLineUsed
        };
        return trusted(strategy, false);
    }

    if (reported - calculated).abs() <= config.tolerance_for(reported) {
        return trusted(AggregationStrategy::TotalLineUsed, false);
    }

    if reported >= calculated {
        return trusted(AggregationStrategy::MaxValue, true);
    }

    AggregateResult {
        value: calculated,
        method: AggregateMethod::CalculatedSum,
        excluded: excluded_from(available, &children_used),
        used: children_used.clone(),
        children_used,
        reported_total: Some(reported),
        calculated_sum: Some(calculated),
        conflict: true,
        strategy: Some(AggregationStrategy::ComponentSum),
    }
}

fn from_components(
    taxonomy: &dyn TaxonomyProvider,
    available: &[&ConceptId],
    values: &BTreeMap<ConceptId, f64>,
) -> AggregateResult {
    let mut nested = BTreeSet::new();
    for component in available {
        nested.extend(taxonomy.all_descendants(component));
    }

    let used: Vec<ConceptId> = available
        .iter()
        .filter(|c| !nested.contains(**c))
        .map(|c| (*c).clone())
        .collect();
    let value: f64 = used.iter().filter_map(|c| values.get(c)).sum();

    let strategy = if used.len() == 1 {
        AggregationStrategy::SingleValue
    } else {
        AggregationStrategy::ComponentSum
    };

    AggregateResult {
        value,
        method: AggregateMethod::ComponentSum,
        excluded: excluded_from(available, &used),
        used,
        children_used: Vec::new(),
        reported_total: None,
        calculated_sum: Some(value),
        conflict: false,
        strategy: Some(strategy),
    }
}
