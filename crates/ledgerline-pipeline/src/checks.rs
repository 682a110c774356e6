//! Cross-statement checks run once per period.

use ledgerline_taxonomy::{check_balance_sheet, check_calculation, ConceptId, TaxonomyProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const REVENUE_TOTAL: &str = "us-gaap_Revenues";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Assets = Liabilities + Equity.
    BalanceSheet,
    /// Reported revenue against its declared components.
    RevenueIntegrity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheck {
    pub period: Option<String>,
    pub kind: CheckKind,
    pub valid: bool,
    pub detail: String,
}

/// Checks whose inputs are present; a check with missing data is skipped.
pub fn cross_checks(
    taxonomy: &dyn TaxonomyProvider,
    period: Option<&str>,
    values: &BTreeMap<ConceptId, f64>,
    revenue_tolerance: f64,
) -> Vec<CrossCheck> {
    let mut checks = Vec::new();

    if let Some(bs) = check_balance_sheet(values) {
        checks.push(CrossCheck {
            period: period.map(str::to_string),
            kind: CheckKind::BalanceSheet,
            valid: bs.valid,
            detail: format!(
                "assets {} vs liabilities + equity {} (difference {})",
                bs.assets, bs.liabilities_plus_equity, bs.difference
            ),
        });
    }

    let revenue = ConceptId::from(REVENUE_TOTAL);
    if let Some(calc) = check_calculation(taxonomy, &revenue, values, revenue_tolerance) {
        // Nothing to compare against.
        if !calc.children_found.is_empty() {
            let mut detail = format!(
                "reported {} vs calculated {} ({:.2}%)",
                calc.reported, calc.calculated, calc.difference_pct
            );
            if !calc.children_missing.is_empty() {
                let missing: Vec<&str> = calc.children_missing.iter().map(|c| c.as_str()).collect();
                detail.push_str(&format!("; missing {}", missing.join(", ")));
            }
            checks.push(CrossCheck {
                period: period.map(str::to_string),
                kind: CheckKind::RevenueIntegrity,
                valid: calc.valid,
                detail,
            });
        }
    }

    for check in checks.iter().filter(|c| !c.valid) {
        tracing::warn!(
            period = check.period.as_deref().unwrap_or("-"),
            kind = ?check.kind,
            detail = %check.detail,
            "cross-statement check failed"
        );
    }
    checks
}
