//! Ledgerline Aggregate: one number per bucket, never double counted
//!
//! ```text
//!   candidates ──► available (has value) ──┬── any total? ──► compare with children
//!                                          │                    ├ within tolerance  TOTAL_LINE_USED
//!                                          │                    ├ reported larger   TOTAL_LINE_USED (conflict)
//!                                          │                    └ children larger   CALCULATED_SUM  (conflict)
//!                                          └── components ────► drop nested ones    COMPONENT_SUM
//!   nothing available ─────────────────────────────────────────────────────────────► NO_DATA
//! ```
//!
//! Tolerance is 1% of the reported total, or 1.0 when the total is zero.
//! The same inputs always give the same value, method and audit trail.

pub mod config;
pub mod record;
pub mod recovery;
pub mod smart;

pub use config::{default_buckets, AggregateConfig, BucketDefinition};
pub use record::record_bucket;
pub use recovery::{aggregate_bucket, BucketOutcome};
pub use smart::{smart_aggregate, AggregateMethod, AggregateResult};
