//! Ledgerline Taxonomy: the read-only concept model behind every resolution
//!
//! ```text
//! ┌───────────────────┐   build (once)   ┌────────────────────┐
//! │ TaxonomySnapshot  │────────────────►│  ResolvedTaxonomy  │◄──── &dyn TaxonomyProvider
//! │ (JSON, external)  │                  │  (immutable)       │      (resolver, aggregator)
//! └───────────────────┘                  └────────────────────┘
//!                                                  ▲ validates
//! ┌───────────────────┐                  ┌─────────┴──────────┐
//! │ override entries  │────── load ────►│   OverrideStore    │◄──── &dyn OverrideProvider
//! └───────────────────┘                  │   (RwLock)         │
//!                                        └────────────────────┘
//! ```
//!
//! The taxonomy has no mutation path after `build`. Overrides are the only
//! read-write layer and are validated against the taxonomy on every add.

pub mod checks;
pub mod concept;
pub mod overrides;
pub mod provider;
pub mod resolved;
pub mod snapshot;

pub use checks::{
    aggregation_sign_hint, check_balance_sheet, check_calculation, declared_sign,
    BalanceSheetCheck, CalculationCheck, SignHint, BALANCE_SHEET_TOLERANCE,
};
pub use concept::{
    normalize_label, AliasEntry, BalanceType, CalculationArc, CalculationChild, Concept,
    ConceptId, Label, LabelRole, PeriodType, PresentationArc,
};
pub use overrides::{OverrideEntry, OverrideProvider, OverrideStore};
pub use provider::{query_tokens, LabelMatch, LabelQuery, MatchKind, TaxonomyProvider};
pub use resolved::{AliasCollision, BuildReport, CoercedWeight, ResolvedTaxonomy};
pub use snapshot::TaxonomySnapshot;

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate concept id: {0}")]
    DuplicateConcept(String),

    #[error("Unknown concept: {0}")]
    UnknownConcept(String),

    #[error("Invalid override: {0}")]
    InvalidOverride(String),
}
