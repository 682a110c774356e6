//! Serialized taxonomy snapshot: the one-time bulk load input.

use crate::concept::{AliasEntry, CalculationArc, Concept, Label, PresentationArc};
use crate::TaxonomyError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to build a [`crate::ResolvedTaxonomy`].
///
/// Produced by an external ingestion step; field names are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySnapshot {
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub presentation: Vec<PresentationArc>,
    #[serde(default)]
    pub calculations: Vec<CalculationArc>,
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
}

impl TaxonomySnapshot {
    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TaxonomyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TaxonomyError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| TaxonomyError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
