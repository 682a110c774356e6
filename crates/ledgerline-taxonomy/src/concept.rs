//! Concepts, labels and the arcs that connect them.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Canonical concept identifier, e.g. `us-gaap_Revenues`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the taxonomy prefix (`us-gaap_Revenues` → `Revenues`).
    pub fn local_name(&self) -> &str {
        match self.0.find(['_', ':']) {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// The taxonomy prefix, if the id has one.
    pub fn prefix(&self) -> Option<&str> {
        self.0.find(['_', ':']).map(|pos| &self.0[..pos])
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConceptId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ConceptId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ConceptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Label normalization used by every index: trim, then lowercase.
pub fn normalize_label(text: &str) -> String {
    text.trim().to_lowercase()
}

// ============================================================================
// Concept metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Instant,
    Duration,
}

/// A taxonomy element. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    #[serde(default)]
    pub balance: Option<BalanceType>,
    #[serde(default)]
    pub period_type: Option<PeriodType>,
    /// Source taxonomy, e.g. `US_GAAP` or `IFRS`.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

impl Concept {
    pub fn new(id: impl Into<ConceptId>) -> Self {
        let id = id.into();
        let source = match id.prefix() {
            Some("ifrs-full") => "IFRS".to_string(),
            Some("us-gaap") => "US_GAAP".to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Self {
            id,
            balance: None,
            period_type: None,
            source,
            data_type: None,
        }
    }

    pub fn with_balance(mut self, balance: BalanceType) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_period(mut self, period_type: PeriodType) -> Self {
        self.period_type = Some(period_type);
        self
    }

    /// Balance-sheet style (point-in-time) concept.
    pub fn is_instant(&self) -> bool {
        self.period_type == Some(PeriodType::Instant)
    }

    pub fn is_duration(&self) -> bool {
        self.period_type == Some(PeriodType::Duration)
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Label roles. Unknown role URIs are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelRole {
    Standard,
    Terse,
    Verbose,
    Total,
    Net,
    PeriodStart,
    PeriodEnd,
    Negated,
    Documentation,
    Other(String),
}

impl LabelRole {
    /// Ranking bonus used by fuzzy label search.
    pub fn fuzzy_boost(&self) -> f64 {
        match self {
            LabelRole::Standard => 10.0,
            LabelRole::Total => 8.0,
            LabelRole::Net => 7.0,
            LabelRole::Terse => 5.0,
            LabelRole::Verbose => 3.0,
            _ => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LabelRole::Standard => "standard",
            LabelRole::Terse => "terse",
            LabelRole::Verbose => "verbose",
            LabelRole::Total => "total",
            LabelRole::Net => "net",
            LabelRole::PeriodStart => "period_start",
            LabelRole::PeriodEnd => "period_end",
            LabelRole::Negated => "negated",
            LabelRole::Documentation => "documentation",
            LabelRole::Other(role) => role,
        }
    }
}

impl fmt::Display for LabelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub concept: ConceptId,
    pub text: String,
    pub role: LabelRole,
}

// ============================================================================
// Arcs
// ============================================================================

/// Child → parent edge in the presentation hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationArc {
    pub child: ConceptId,
    pub parent: ConceptId,
}

/// Raw calculation arc as it appears in a snapshot; weight may be anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationArc {
    pub parent: ConceptId,
    pub child: ConceptId,
    pub weight: f64,
    #[serde(default)]
    pub order: f64,
}

/// A resolved calculation child. `weight` is always `1.0` or `-1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationChild {
    pub child: ConceptId,
    pub weight: f64,
    pub order: f64,
}

/// Curated alias: free text that should resolve to a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub concept: ConceptId,
    #[serde(default)]
    pub source: Option<String>,
}
