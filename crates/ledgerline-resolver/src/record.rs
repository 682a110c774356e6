//! Emit resolutions into the lineage graph as Mapping steps.

use crate::resolution::Resolution;
use ledgerline_lineage::{Alternative, EdgeId, LineageBuilder, LineageError, MappingStep, NodeId};
use std::collections::BTreeMap;

impl Resolution {
    /// Mapping step for this result. The explanation and, for hierarchy
    /// hits, the walked path travel as node metadata.
    pub fn mapping_step(&self) -> MappingStep {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "resolution".to_string(),
            serde_json::Value::from(self.explanation.clone()),
        );
        if let Some(path) = self.audit_path() {
            let path: Vec<&str> = path.iter().map(|c| c.as_str()).collect();
            metadata.insert("hierarchy_path".to_string(), serde_json::Value::from(path));
        }

        MappingStep {
            concept: self.concept.clone(),
            tier: self.tier(),
            method: self.method.clone(),
            confidence: self.confidence,
            alternatives: self
                .alternatives
                .iter()
                .map(|c| Alternative {
                    concept: c.concept.clone(),
                    method: c.method.clone(),
                    confidence: c.confidence,
                })
                .collect(),
            metadata,
        }
    }
}

/// Append a Mapped node for `extracted`.
pub fn record_resolution(
    builder: &mut LineageBuilder,
    extracted: &NodeId,
    resolution: &Resolution,
) -> Result<(NodeId, EdgeId), LineageError> {
    builder.add_mapping(extracted, resolution.mapping_step())
}
