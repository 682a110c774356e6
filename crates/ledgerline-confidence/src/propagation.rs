//! Confidence propagation through transformations.
//!
//! `output = min(inputs) × t × complexity`, clamped to `[0, min(inputs)]`.

use crate::Confidence;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formula families, ordered from least to most fragile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    SimpleArithmetic,
    Multiplication,
    GrowthRate,
    Wacc,
    TerminalValue,
    Irr,
}

impl FormulaKind {
    /// Reliability factor applied on top of the transformation confidence.
    pub fn complexity_factor(self) -> f64 {
        match self {
            FormulaKind::SimpleArithmetic => 1.00,
            FormulaKind::Multiplication => 0.98,
            FormulaKind::GrowthRate => 0.95,
            FormulaKind::Wacc => 0.90,
            FormulaKind::TerminalValue => 0.85,
            FormulaKind::Irr => 0.80,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FormulaKind::SimpleArithmetic => "Simple arithmetic (add/subtract)",
            FormulaKind::Multiplication => "Multiplication/division",
            FormulaKind::GrowthRate => "Growth rate calculation",
            FormulaKind::Wacc => "WACC calculation (multiple assumptions)",
            FormulaKind::TerminalValue => "Terminal value (perpetuity assumption)",
            FormulaKind::Irr => "IRR calculation (iterative solution)",
        }
    }

    /// Classify formula text. Checks run most-specific first.
    pub fn infer(formula: &str) -> FormulaKind {
        let lower = formula.to_lowercase();
        if lower.contains("irr") || lower.contains("internal rate") {
            FormulaKind::Irr
        } else if lower.contains("wacc") || lower.contains("cost of capital") {
            FormulaKind::Wacc
        } else if lower.contains("terminal") || lower.contains("perpetuity") {
            FormulaKind::TerminalValue
        } else if lower.contains("growth") || lower.contains("cagr") {
            FormulaKind::GrowthRate
        } else if lower.contains(['*', '/', '×', '÷']) {
            FormulaKind::Multiplication
        } else {
            FormulaKind::SimpleArithmetic
        }
    }
}

impl fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result of one propagation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    pub confidence: Confidence,
    pub explanation: String,
    /// The weakest valid input, if any input was usable.
    pub weakest_input: Option<Confidence>,
    pub valid_inputs: usize,
}

/// Propagate input confidences through a transformation.
///
/// `None` inputs (and non-finite raw values) are skipped. With no usable input the
/// result is `0.00` and the explanation says why.
pub fn propagate(
    inputs: &[Option<Confidence>],
    transform: Confidence,
    formula: Option<FormulaKind>,
) -> Propagation {
    if inputs.is_empty() {
        return Propagation {
            confidence: Confidence::ZERO,
            explanation: "No source data - cannot calculate confidence".to_string(),
            weakest_input: None,
            valid_inputs: 0,
        };
    }

    let valid: Vec<Confidence> = inputs
        .iter()
        .flatten()
        .copied()
        .filter(|c| c.value().is_finite())
        .collect();

    let Some(weakest) = valid.iter().copied().reduce(Confidence::min) else {
        return Propagation {
            confidence: Confidence::ZERO,
            explanation: "No valid source confidences".to_string(),
            weakest_input: None,
            valid_inputs: 0,
        };
    };

    let factor = formula.map(FormulaKind::complexity_factor).unwrap_or(1.0);
    let raw = weakest.value() * transform.value() * factor;
    let bounded = raw.clamp(0.0, weakest.value().max(0.0));
    let confidence = Confidence::new(bounded);

    let listed = valid
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let mut explanation = format!(
        "Propagated from {} source(s): MIN({}) = {} × transform({})",
        valid.len(),
        listed,
        weakest,
        transform
    );
    if factor != 1.0 {
        explanation.push_str(&format!(" × complexity({factor:.2})"));
    }
    explanation.push_str(&format!(" = {:.3}", confidence.value()));
    if let Some(kind) = formula {
        explanation.push_str(&format!(" [{}]", kind.description()));
    }

    Propagation {
        confidence,
        explanation,
        weakest_input: Some(weakest),
        valid_inputs: valid.len(),
    }
}
