//! Derived metrics: signed sums over buckets and earlier metrics.

use ledgerline_confidence::Confidence;
use ledgerline_lineage::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTerm {
    /// Bucket or metric name.
    pub input: String,
    /// `1.0` adds, `-1.0` subtracts.
    pub sign: f64,
    /// An absent optional term is left out instead of skipping the metric.
    #[serde(default)]
    pub optional: bool,
}

impl MetricTerm {
    pub fn plus(input: &str) -> Self {
        Self {
            input: input.to_string(),
            sign: 1.0,
            optional: false,
        }
    }

    pub fn minus(input: &str) -> Self {
        Self {
            input: input.to_string(),
            sign: -1.0,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub label: String,
    pub terms: Vec<MetricTerm>,
}

/// A value already placed in the lineage graph for the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodInput {
    pub node: NodeId,
    pub value: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvaluation {
    pub value: f64,
    pub nodes: Vec<NodeId>,
    pub values: BTreeMap<String, f64>,
    pub skipped_optional: Vec<String>,
}

impl MetricDefinition {
    pub fn new(name: &str, label: &str, terms: Vec<MetricTerm>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            terms,
        }
    }

    /// Formula text, e.g. `revenue - cogs`.
    pub fn formula(&self) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            match (i, term.sign < 0.0) {
                (0, false) => {}
                (0, true) => out.push('-'),
                (_, false) => out.push_str(" + "),
                (_, true) => out.push_str(" - "),
            }
            out.push_str(&term.input);
        }
        out
    }

    /// `None` when a required term has no value for the period.
    pub fn evaluate(&self, inputs: &BTreeMap<String, PeriodInput>) -> Option<MetricEvaluation> {
        let mut value = 0.0;
        let mut nodes = Vec::new();
        let mut values = BTreeMap::new();
        let mut skipped_optional = Vec::new();

        for term in &self.terms {
            match inputs.get(&term.input) {
                Some(input) => {
                    value += term.sign * input.value;
                    nodes.push(input.node.clone());
                    values.insert(term.input.clone(), input.value);
                }
                None if term.optional => skipped_optional.push(term.input.clone()),
                None => return None,
            }
        }

        Some(MetricEvaluation {
            value,
            nodes,
            values,
            skipped_optional,
        })
    }
}

pub fn default_metrics() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition::new(
            "gross_profit",
            "Gross Profit",
            vec![MetricTerm::plus("revenue"), MetricTerm::minus("cogs")],
        ),
        MetricDefinition::new(
            "ebitda",
            "EBITDA",
            vec![
                MetricTerm::plus("gross_profit"),
                MetricTerm::minus("sga"),
                MetricTerm::minus("rnd").optional(),
            ],
        ),
        MetricDefinition::new(
            "ebit",
            "EBIT",
            vec![MetricTerm::plus("ebitda"), MetricTerm::minus("dna")],
        ),
        MetricDefinition::new(
            "net_debt",
            "Net Debt",
            vec![MetricTerm::plus("debt"), MetricTerm::minus("cash").optional()],
        ),
        MetricDefinition::new(
            "working_capital",
            "Working Capital",
            vec![
                MetricTerm::plus("current_assets"),
                MetricTerm::minus("current_liabilities"),
            ],
        ),
    ]
}
