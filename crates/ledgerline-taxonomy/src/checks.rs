//! Calculation integrity checks and aggregation sign hints.

use crate::concept::{BalanceType, Concept, ConceptId};
use crate::provider::TaxonomyProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relative tolerance for the balance-sheet equation (0.1%).
pub const BALANCE_SHEET_TOLERANCE: f64 = 0.001;

const ASSET_IDS: &[&str] = &["us-gaap_Assets", "ifrs-full_Assets"];
const LIABILITY_IDS: &[&str] = &["us-gaap_Liabilities", "ifrs-full_Liabilities"];
// Priority order. Total equity including noncontrolling interest is what
// balances against total assets, so it wins over the parent-only figure.
const EQUITY_IDS: &[&str] = &[
    "us-gaap_StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
    "us-gaap_StockholdersEquity",
    "ifrs-full_Equity",
];

const EXPENSE_KEYWORDS: &[&str] = &[
    "Expense",
    "Cost",
    "Loss",
    "Impairment",
    "Depreciation",
    "Amortization",
    "Restructuring",
    "Tax",
    "Interest",
];
const REVENUE_KEYWORDS: &[&str] = &["Revenue", "Sales", "Income", "Gain"];

// ============================================================================
// Calculation checks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationCheck {
    pub parent: ConceptId,
    pub reported: f64,
    pub calculated: f64,
    pub difference: f64,
    /// Difference as a percentage of |reported|; 0 when reported is 0.
    pub difference_pct: f64,
    pub valid: bool,
    pub children_found: Vec<ConceptId>,
    pub children_missing: Vec<ConceptId>,
}

/// Compare a reported total against the weighted sum of its present children.
///
/// `None` when the parent declares no children or has no reported value.
pub fn check_calculation(
    taxonomy: &dyn TaxonomyProvider,
    parent: &ConceptId,
    values: &BTreeMap<ConceptId, f64>,
    tolerance_pct: f64,
) -> Option<CalculationCheck> {
    let children = taxonomy.calculation_children(parent);
    if children.is_empty() {
        return None;
    }
    let reported = *values.get(parent)?;

    let mut calculated = 0.0;
    let mut children_found = Vec::new();
    let mut children_missing = Vec::new();
    for child in children {
        match values.get(&child.child) {
            Some(value) => {
                calculated += value * child.weight;
                children_found.push(child.child.clone());
            }
            None => children_missing.push(child.child.clone()),
        }
    }

    let difference = (reported - calculated).abs();
    let tolerance = if reported != 0.0 {
        reported.abs() * tolerance_pct
    } else {
        1.0
    };

    Some(CalculationCheck {
        parent: parent.clone(),
        reported,
        calculated,
        difference,
        difference_pct: if reported != 0.0 {
            difference / reported.abs() * 100.0
        } else {
            0.0
        },
        valid: difference <= tolerance,
        children_found,
        children_missing,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetCheck {
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
    pub liabilities_plus_equity: f64,
    pub difference: f64,
    pub valid: bool,
}

/// Value of the first id in `ids` that is present. The ids are alternative
/// tags for the same total, so they are never added together.
fn first_present(values: &BTreeMap<ConceptId, f64>, ids: &[&str]) -> Option<f64> {
    ids.iter().find_map(|id| values.get(*id).copied())
}

/// Assets = Liabilities + Equity within 0.1%.
///
/// `None` unless assets and at least one of liabilities/equity are known.
pub fn check_balance_sheet(values: &BTreeMap<ConceptId, f64>) -> Option<BalanceSheetCheck> {
    let assets = first_present(values, ASSET_IDS)?;
    let liabilities = first_present(values, LIABILITY_IDS);
    let equity = first_present(values, EQUITY_IDS);
    if liabilities.is_none() && equity.is_none() {
        return None;
    }
    let liabilities = liabilities.unwrap_or(0.0);
    let equity = equity.unwrap_or(0.0);
    let rhs = liabilities + equity;
    let difference = (assets - rhs).abs();
    let tolerance = if assets != 0.0 {
        assets.abs() * BALANCE_SHEET_TOLERANCE
    } else {
        1.0
    };
    Some(BalanceSheetCheck {
        assets,
        liabilities,
        equity,
        liabilities_plus_equity: rhs,
        difference,
        valid: difference <= tolerance,
    })
}

// ============================================================================
// Sign hints
// ============================================================================

/// Sign to apply when aggregating a concept into a profitability measure.
///
/// Derived from substring heuristics on the concept id, so it is never
/// authoritative. Prefer [`declared_sign`] where balance metadata exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignHint {
    pub sign: i8,
    pub authoritative: bool,
}

pub fn is_expense_concept(id: &ConceptId) -> bool {
    EXPENSE_KEYWORDS.iter().any(|kw| id.as_str().contains(kw))
}

pub fn is_revenue_concept(id: &ConceptId) -> bool {
    REVENUE_KEYWORDS.iter().any(|kw| id.as_str().contains(kw))
}

pub fn aggregation_sign_hint(concept: &Concept) -> SignHint {
    let sign = match concept.balance {
        Some(BalanceType::Debit) if is_expense_concept(&concept.id) => -1,
        _ => 1,
    };
    SignHint {
        sign,
        authoritative: false,
    }
}

/// Ledger sign from declared balance metadata: debits +1, credits −1.
pub fn declared_sign(concept: &Concept) -> Option<i8> {
    concept.balance.map(|balance| match balance {
        BalanceType::Debit => 1,
        BalanceType::Credit => -1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_debits_are_negative_hints() {
        let c = Concept::new("us-gaap_InterestExpense").with_balance(BalanceType::Debit);
        assert_eq!(aggregation_sign_hint(&c).sign, -1);
        assert!(!aggregation_sign_hint(&c).authoritative);
        assert_eq!(declared_sign(&c), Some(1));

        let r = Concept::new("us-gaap_Revenues").with_balance(BalanceType::Credit);
        assert_eq!(aggregation_sign_hint(&r).sign, 1);
        assert!(is_revenue_concept(&r.id));
        assert_eq!(declared_sign(&r), Some(-1));
    }

    #[test]
    fn balance_sheet_needs_both_sides() {
        let mut values = BTreeMap::new();
        values.insert(ConceptId::from("us-gaap_Assets"), 1000.0);
        assert!(check_balance_sheet(&values).is_none());

        values.insert(ConceptId::from("us-gaap_Liabilities"), 600.0);
        values.insert(ConceptId::from("us-gaap_StockholdersEquity"), 399.5);
        let check = check_balance_sheet(&values).unwrap();
        assert!(check.valid);
        assert_eq!(check.liabilities_plus_equity, 999.5);
    }

    #[test]
    fn test_balance_sheet_takes_one_equity_total() {
        let mut values = BTreeMap::new();
        values.insert(ConceptId::from("us-gaap_Assets"), 1000.0);
        values.insert(ConceptId::from("us-gaap_Liabilities"), 600.0);
        values.insert(ConceptId::from("us-gaap_StockholdersEquity"), 380.0);
        values.insert(
            ConceptId::from(
                "us-gaap_StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            ),
            400.0,
        );
        values.insert(ConceptId::from("ifrs-full_Equity"), 400.0);

        let check = check_balance_sheet(&values).unwrap();
        assert_eq!(check.equity, 400.0);
        assert_eq!(check.liabilities_plus_equity, 1000.0);
        assert!(check.valid);
    }
}
