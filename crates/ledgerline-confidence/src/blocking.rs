//! Per-model blocking policy.
//!
//! Each model declares its critical inputs with two thresholds. A verdict is
//! `Blocked` if any input is below its blocking threshold or exactly zero (or
//! absent), `Warning` if any is below its warning threshold, else `Pass`.

use crate::Confidence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Models and thresholds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelType {
    Dcf,
    Lbo,
    Comps,
}

impl ModelType {
    /// Case-insensitive; `COMPARABLES` is accepted for comps.
    pub fn parse(name: &str) -> Option<ModelType> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DCF" => Some(ModelType::Dcf),
            "LBO" => Some(ModelType::Lbo),
            "COMPS" | "COMPARABLES" => Some(ModelType::Comps),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Dcf => "DCF",
            ModelType::Lbo => "LBO",
            ModelType::Comps => "COMPS",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for one critical input. `warn_below` must be ≥ `block_below`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputThreshold {
    pub input: String,
    pub block_below: Confidence,
    pub warn_below: Confidence,
}

impl InputThreshold {
    pub fn new(input: impl Into<String>, block_below: u32, warn_below: u32) -> Self {
        Self {
            input: input.into(),
            block_below: Confidence::from_hundredths(block_below),
            warn_below: Confidence::from_hundredths(warn_below.max(block_below)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRules {
    pub model: ModelType,
    pub critical_inputs: Vec<InputThreshold>,
}

impl ModelRules {
    pub fn threshold(&self, input: &str) -> Option<&InputThreshold> {
        self.critical_inputs.iter().find(|t| t.input == input)
    }
}

/// Blocking thresholds for every supported model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingPolicy {
    pub models: Vec<ModelRules>,
}

impl Default for BlockingPolicy {
    fn default() -> Self {
        Self {
            models: vec![
                ModelRules {
                    model: ModelType::Dcf,
                    critical_inputs: vec![
                        InputThreshold::new("Revenue", 60, 75),
                        InputThreshold::new("EBITDA", 60, 75),
                        InputThreshold::new("Net Income", 50, 60),
                        InputThreshold::new("WACC", 70, 80),
                        InputThreshold::new("Capex", 50, 60),
                        InputThreshold::new("Working Capital", 50, 60),
                    ],
                },
                ModelRules {
                    model: ModelType::Lbo,
                    critical_inputs: vec![
                        InputThreshold::new("EBITDA", 65, 75),
                        InputThreshold::new("Debt", 70, 80),
                        InputThreshold::new("Interest Expense", 70, 80),
                        InputThreshold::new("Exit EBITDA", 60, 70),
                        InputThreshold::new("IRR", 50, 65),
                        InputThreshold::new("Cash Flow", 60, 75),
                    ],
                },
                ModelRules {
                    model: ModelType::Comps,
                    critical_inputs: vec![
                        InputThreshold::new("Revenue", 60, 75),
                        InputThreshold::new("EBITDA", 60, 75),
                        InputThreshold::new("Market Cap", 80, 85),
                        InputThreshold::new("Enterprise Value", 75, 80),
                    ],
                },
            ],
        }
    }
}

// ============================================================================
// Verdicts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Warning,
    Blocked,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerdictStatus::Pass => "PASS",
            VerdictStatus::Warning => "WARNING",
            VerdictStatus::Blocked => "BLOCKED",
        })
    }
}

/// One offending input with the threshold it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub input: String,
    pub confidence: Option<Confidence>,
    pub threshold: Option<Confidence>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingVerdict {
    /// The model name exactly as requested.
    pub model: String,
    pub status: VerdictStatus,
    pub blocking: Vec<Finding>,
    pub warnings: Vec<Finding>,
    /// Minimum over the declared critical inputs; zero when any is missing.
    pub overall_confidence: Confidence,
    /// Inputs supplied by the caller that the model does not declare.
    pub unassessed: Vec<String>,
}

impl BlockingVerdict {
    pub fn is_blocked(&self) -> bool {
        self.status == VerdictStatus::Blocked
    }

    pub fn blocking_reasons(&self) -> Vec<&str> {
        self.blocking.iter().map(|f| f.reason.as_str()).collect()
    }

    pub fn warning_reasons(&self) -> Vec<&str> {
        self.warnings.iter().map(|f| f.reason.as_str()).collect()
    }
}

impl BlockingPolicy {
    pub fn rules(&self, model: ModelType) -> Option<&ModelRules> {
        self.models.iter().find(|m| m.model == model)
    }

    /// Evaluate critical-input confidences for `model`.
    ///
    /// `None` (or an absent declared input) is missing data and blocks.
    pub fn evaluate(
        &self,
        model: &str,
        inputs: &BTreeMap<String, Option<Confidence>>,
    ) -> BlockingVerdict {
        let rules = match ModelType::parse(model).and_then(|m| self.rules(m)) {
            Some(rules) => rules,
            None => {
                tracing::warn!(model = %model, "blocking evaluation requested for unknown model");
                return BlockingVerdict {
                    model: model.to_string(),
                    status: VerdictStatus::Blocked,
                    blocking: vec![Finding {
                        input: model.to_string(),
                        confidence: None,
                        threshold: None,
                        reason: format!("Unknown model type: {model}"),
                    }],
                    warnings: Vec::new(),
                    overall_confidence: Confidence::ZERO,
                    unassessed: inputs.keys().cloned().collect(),
                };
            }
        };

        let mut blocking = Vec::new();
        let mut warnings = Vec::new();
        let mut overall = Confidence::ONE;

        for threshold in &rules.critical_inputs {
            let observed = inputs.get(&threshold.input).copied().flatten();
            let Some(confidence) = observed else {
                overall = Confidence::ZERO;
                blocking.push(Finding {
                    input: threshold.input.clone(),
                    confidence: None,
                    threshold: Some(threshold.block_below),
                    reason: format!(
                        "{} is missing (no data) - CRITICAL BLOCKER",
                        threshold.input
                    ),
                });
                continue;
            };

            overall = overall.min(confidence);

            if confidence.is_zero() {
                blocking.push(Finding {
                    input: threshold.input.clone(),
                    confidence: Some(confidence),
                    threshold: Some(threshold.block_below),
                    reason: format!(
                        "{} has zero confidence (missing or invalid data) - CRITICAL BLOCKER",
                        threshold.input
                    ),
                });
            } else if confidence.value() < threshold.block_below.value() {
                blocking.push(Finding {
                    input: threshold.input.clone(),
                    confidence: Some(confidence),
                    threshold: Some(threshold.block_below),
                    reason: format!(
                        "{} confidence ({}) below minimum threshold ({})",
                        threshold.input, confidence, threshold.block_below
                    ),
                });
            } else if confidence.value() < threshold.warn_below.value() {
                warnings.push(Finding {
                    input: threshold.input.clone(),
                    confidence: Some(confidence),
                    threshold: Some(threshold.warn_below),
                    reason: format!(
                        "{} confidence ({}) below recommended threshold ({})",
                        threshold.input, confidence, threshold.warn_below
                    ),
                });
            }
        }

        let unassessed = inputs
            .keys()
            .filter(|name| rules.threshold(name).is_none())
            .cloned()
            .collect();

        let status = if !blocking.is_empty() {
            VerdictStatus::Blocked
        } else if !warnings.is_empty() {
            VerdictStatus::Warning
        } else {
            VerdictStatus::Pass
        };

        tracing::debug!(
            model = %rules.model,
            status = %status,
            blockers = blocking.len(),
            warnings = warnings.len(),
            "blocking verdict"
        );

        BlockingVerdict {
            model: model.to_string(),
            status,
            blocking,
            warnings,
            overall_confidence: overall,
            unassessed,
        }
    }
}
