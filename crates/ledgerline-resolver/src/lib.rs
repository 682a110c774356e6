//! Ledgerline Resolver: free text to taxonomy concept, deterministically
//!
//! ```text
//!  raw label ──normalize──► tier 0  override memory        1.00
//!                           tier 1  explicit alias         0.95
//!                           tier 2  exact standard label   0.90
//!                           tier 2.5 fuzzy label search    0.50..0.90
//!                           tier 3  keyword rules          0.70
//!                           tier 4  hierarchy fallback     0.70 → 0.50
//!                           tier 5  unmapped               0.00
//! ```
//!
//! The first tier that hits wins. Every ranking step has an explicit
//! tie-break, so identical taxonomy state and input always give the same
//! [`Resolution`].

pub mod config;
pub mod fuzzy;
pub mod hierarchy;
pub mod record;
pub mod resolution;
pub mod resolver;
pub mod stats;

pub use config::{default_keyword_rules, KeywordRule, ResolverConfig, DEFAULT_SAFE_PARENTS};
pub use fuzzy::{blended_score, FuzzyHit};
pub use hierarchy::{find_safe_parent, SafeParent};
pub use record::record_resolution;
pub use resolution::{Candidate, Resolution, ResolutionDetail};
pub use resolver::Resolver;
pub use stats::ResolutionStats;
