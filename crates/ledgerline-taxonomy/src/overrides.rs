//! User overrides ("analyst memory"): the highest-priority resolution layer.

use crate::concept::{normalize_label, ConceptId};
use crate::provider::TaxonomyProvider;
use crate::TaxonomyError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One user override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// Label as the user typed it.
    pub label: String,
    pub concept: ConceptId,
    #[serde(default)]
    pub source_taxonomy: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl OverrideEntry {
    pub fn new(label: impl Into<String>, concept: impl Into<ConceptId>) -> Self {
        Self {
            label: label.into(),
            concept: concept.into(),
            source_taxonomy: None,
            confidence: default_confidence(),
            created_at: Utc::now(),
            created_by: None,
            notes: None,
        }
    }

    pub fn key(&self) -> String {
        normalize_label(&self.label)
    }
}

/// Lookup contract for overrides.
pub trait OverrideProvider: Send + Sync {
    /// Exact lookup on normalized text.
    fn lookup(&self, normalized: &str) -> Option<ConceptId>;

    /// All entries, ordered by normalized label, for audit export.
    fn entries(&self) -> Vec<OverrideEntry>;
}

/// In-memory override store, shareable across threads.
#[derive(Debug, Default)]
pub struct OverrideStore {
    entries: RwLock<BTreeMap<String, OverrideEntry>>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entries, rejecting those that name unknown concepts.
    ///
    /// Returns the store and the rejected entries. Later duplicates win.
    pub fn load(
        entries: impl IntoIterator<Item = OverrideEntry>,
        taxonomy: &dyn TaxonomyProvider,
    ) -> (Self, Vec<OverrideEntry>) {
        let store = Self::new();
        let mut rejected = Vec::new();
        for entry in entries {
            if let Err(err) = store.add(entry.clone(), taxonomy) {
                tracing::warn!(label = %entry.label, error = %err, "rejecting override entry");
                rejected.push(entry);
            }
        }
        (store, rejected)
    }

    /// Add or replace an entry. Returns the previous entry for the same label.
    pub fn add(
        &self,
        entry: OverrideEntry,
        taxonomy: &dyn TaxonomyProvider,
    ) -> Result<Option<OverrideEntry>, TaxonomyError> {
        let key = entry.key();
        if key.is_empty() {
            return Err(TaxonomyError::InvalidOverride(
                "override label is empty".to_string(),
            ));
        }
        if !taxonomy.contains(&entry.concept) {
            return Err(TaxonomyError::UnknownConcept(entry.concept.to_string()));
        }
        Ok(self.entries.write().insert(key, entry))
    }

    pub fn remove(&self, label: &str) -> Option<OverrideEntry> {
        self.entries.write().remove(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl OverrideProvider for OverrideStore {
    fn lookup(&self, normalized: &str) -> Option<ConceptId> {
        self.entries
            .read()
            .get(normalized)
            .map(|entry| entry.concept.clone())
    }

    fn entries(&self) -> Vec<OverrideEntry> {
        self.entries.read().values().cloned().collect()
    }
}
