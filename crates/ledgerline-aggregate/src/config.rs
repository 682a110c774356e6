//! Aggregation tolerances and bucket definitions.

use ledgerline_taxonomy::ConceptId;
use serde::{Deserialize, Serialize};

/// Tolerances for comparing a reported total against its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Relative tolerance against |reported|.
    pub relative_tolerance: f64,
    /// Absolute tolerance used when the reported total is exactly zero.
    pub zero_total_tolerance: f64,
    /// Presentation levels the last-resort recovery pass may climb.
    pub recovery_depth: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 0.01,
            zero_total_tolerance: 1.0,
            recovery_depth: 5,
        }
    }
}

impl AggregateConfig {
    pub fn tolerance_for(&self, reported: f64) -> f64 {
        if reported == 0.0 {
            self.zero_total_tolerance
        } else {
            reported.abs() * self.relative_tolerance
        }
    }
}

/// One semantic bucket: an ordered candidate list, totals first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDefinition {
    pub name: String,
    pub label: String,
    pub concepts: Vec<ConceptId>,
}

impl BucketDefinition {
    pub fn new(name: &str, label: &str, concepts: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            concepts: concepts.iter().map(|c| ConceptId::from(*c)).collect(),
        }
    }

    /// The concept an aggregated node is tagged with.
    pub fn primary(&self) -> Option<&ConceptId> {
        self.concepts.first()
    }
}

pub fn default_buckets() -> Vec<BucketDefinition> {
    vec![
        BucketDefinition::new(
            "revenue",
            "Revenue",
            &[
                "us-gaap_Revenues",
                "us-gaap_SalesRevenueNet",
                "ifrs-full_Revenue",
                "us-gaap_SalesRevenueGoodsNet",
                "us-gaap_SalesRevenueServicesNet",
            ],
        ),
        BucketDefinition::new(
            "cogs",
            "Cost of Revenue",
            &[
                "us-gaap_CostOfRevenue",
                "us-gaap_CostOfGoodsAndServicesSold",
                "us-gaap_CostOfGoodsSold",
                "us-gaap_CostOfServices",
            ],
        ),
        BucketDefinition::new(
            "sga",
            "SG&A",
            &[
                "us-gaap_SellingGeneralAndAdministrativeExpense",
                "ifrs-full_AdministrativeExpense",
            ],
        ),
        BucketDefinition::new("rnd", "R&D", &["us-gaap_ResearchAndDevelopmentExpense"]),
        BucketDefinition::new(
            "dna",
            "D&A",
            &[
                "us-gaap_DepreciationDepletionAndAmortization",
                "us-gaap_Depreciation",
                "us-gaap_AmortizationOfIntangibleAssets",
            ],
        ),
        BucketDefinition::new(
            "interest",
            "Interest Expense",
            &["us-gaap_InterestExpense", "ifrs-full_FinanceCosts"],
        ),
        BucketDefinition::new(
            "tax",
            "Income Tax",
            &[
                "us-gaap_IncomeTaxExpenseBenefit",
                "ifrs-full_IncomeTaxExpenseContinuingOperations",
            ],
        ),
        BucketDefinition::new(
            "net_income",
            "Net Income",
            &["us-gaap_NetIncomeLoss", "ifrs-full_ProfitLoss"],
        ),
        BucketDefinition::new(
            "cash",
            "Cash",
            &[
                "us-gaap_CashAndCashEquivalentsAtCarryingValue",
                "ifrs-full_CashAndCashEquivalents",
            ],
        ),
        BucketDefinition::new(
            "debt",
            "Debt",
            &[
                "us-gaap_LongTermDebt",
                "us-gaap_DebtInstrumentCarryingAmount",
                "us-gaap_ShortTermDebt",
                "us-gaap_CommercialPaper",
                "us-gaap_SeniorNotes",
            ],
        ),
        BucketDefinition::new(
            "capex",
            "Capex",
            &["us-gaap_PaymentsToAcquirePropertyPlantAndEquipment"],
        ),
        BucketDefinition::new(
            "current_assets",
            "Current Assets",
            &[
                "us-gaap_AssetsCurrent",
                "us-gaap_AccountsReceivableNetCurrent",
                "us-gaap_InventoryNet",
                "us-gaap_PrepaidExpenseCurrent",
                "us-gaap_OtherAssetsCurrent",
            ],
        ),
        BucketDefinition::new(
            "current_liabilities",
            "Current Liabilities",
            &[
                "us-gaap_LiabilitiesCurrent",
                "us-gaap_AccountsPayableCurrent",
                "us-gaap_AccruedLiabilitiesCurrent",
                "us-gaap_OtherLiabilitiesCurrent",
            ],
        ),
    ]
}
