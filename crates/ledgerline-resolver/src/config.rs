//! Resolver configuration: safe parents, keyword rules and limits.

use ledgerline_taxonomy::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Concepts a hierarchy walk may stop at. Aggregation-meaningful roots only.
pub const DEFAULT_SAFE_PARENTS: &[&str] = &[
    "us-gaap_Revenues",
    "us-gaap_SalesRevenueNet",
    "ifrs-full_Revenue",
    "us-gaap_CostOfRevenue",
    "us-gaap_CostOfGoodsAndServicesSold",
    "us-gaap_OperatingExpenses",
    "us-gaap_SellingGeneralAndAdministrativeExpense",
    "us-gaap_ResearchAndDevelopmentExpense",
    "us-gaap_Assets",
    "us-gaap_AssetsCurrent",
    "us-gaap_AssetsNoncurrent",
    "us-gaap_CashAndCashEquivalentsAtCarryingValue",
    "us-gaap_AccountsReceivableNetCurrent",
    "us-gaap_InventoryNet",
    "us-gaap_PropertyPlantAndEquipmentNet",
    "us-gaap_Liabilities",
    "us-gaap_LiabilitiesCurrent",
    "us-gaap_LiabilitiesNoncurrent",
    "us-gaap_AccountsPayableCurrent",
    "us-gaap_LongTermDebt",
    "us-gaap_StockholdersEquity",
    "us-gaap_RetainedEarningsAccumulatedDeficit",
    "us-gaap_NetCashProvidedByUsedInOperatingActivities",
    "us-gaap_PaymentsToAcquirePropertyPlantAndEquipment",
    "us-gaap_NetIncomeLoss",
    "us-gaap_DepreciationDepletionAndAmortization",
    "us-gaap_InterestExpense",
    "us-gaap_IncomeTaxExpenseBenefit",
];

/// A named substring rule for the keyword tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub name: String,
    /// Lowercase substrings; any one matching fires the rule.
    pub patterns: Vec<String>,
    pub concept: ConceptId,
}

impl KeywordRule {
    pub fn new(name: &str, patterns: &[&str], concept: &str) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            concept: ConceptId::from(concept),
        }
    }

    /// First pattern contained in `normalized`.
    pub fn matches<'a>(&'a self, normalized: &str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find(|p| !p.is_empty() && normalized.contains(p.as_str()))
            .map(String::as_str)
    }
}

/// Keyword rules in evaluation order. Cost rules precede revenue because
/// "cost of revenue" contains "revenue".
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "cogs",
            &["cost of revenue", "cost of goods", "cost of sales", "cogs"],
            "us-gaap_CostOfRevenue",
        ),
        KeywordRule::new(
            "revenue",
            &["revenue", "sales", "turnover"],
            "us-gaap_Revenues",
        ),
        KeywordRule::new(
            "sg&a",
            &["sg&a", "selling, general", "general and administrative"],
            "us-gaap_SellingGeneralAndAdministrativeExpense",
        ),
        KeywordRule::new(
            "r&d",
            &["r&d", "research and development", "research & development"],
            "us-gaap_ResearchAndDevelopmentExpense",
        ),
        KeywordRule::new(
            "depreciation",
            &["depreciation", "amortization", "d&a"],
            "us-gaap_DepreciationDepletionAndAmortization",
        ),
        KeywordRule::new("interest", &["interest"], "us-gaap_InterestExpense"),
        KeywordRule::new("tax", &["tax"], "us-gaap_IncomeTaxExpenseBenefit"),
        KeywordRule::new(
            "cash",
            &["cash"],
            "us-gaap_CashAndCashEquivalentsAtCarryingValue",
        ),
        KeywordRule::new(
            "receivable",
            &["receivable"],
            "us-gaap_AccountsReceivableNetCurrent",
        ),
        KeywordRule::new("inventory", &["inventor"], "us-gaap_InventoryNet"),
        KeywordRule::new(
            "ppe",
            &["pp&e", "ppe", "property, plant", "property and equipment"],
            "us-gaap_PropertyPlantAndEquipmentNet",
        ),
        KeywordRule::new("payable", &["payable"], "us-gaap_AccountsPayableCurrent"),
        KeywordRule::new("debt", &["debt", "borrowings"], "us-gaap_LongTermDebt"),
        KeywordRule::new("equity", &["equity"], "us-gaap_StockholdersEquity"),
        KeywordRule::new(
            "retained earnings",
            &["retained earnings", "accumulated deficit"],
            "us-gaap_RetainedEarningsAccumulatedDeficit",
        ),
        KeywordRule::new(
            "net income",
            &["net income", "net earnings", "net loss"],
            "us-gaap_NetIncomeLoss",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Enables the hierarchy fallback tier.
    pub safe_mode: bool,
    /// Presentation levels a hierarchy walk may climb.
    pub max_hierarchy_depth: usize,
    /// Inputs shorter than this (in chars) skip the fuzzy tier.
    pub fuzzy_min_len: usize,
    pub safe_parents: BTreeSet<ConceptId>,
    pub keyword_rules: Vec<KeywordRule>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            max_hierarchy_depth: 5,
            fuzzy_min_len: 3,
            safe_parents: DEFAULT_SAFE_PARENTS.iter().map(|&id| id.into()).collect(),
            keyword_rules: default_keyword_rules(),
        }
    }
}
