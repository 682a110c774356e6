//! JSON export and import of a lineage graph.

use crate::graph::{GraphMetadata, LineageGraph};
use crate::model::{LineageEdge, LineageNode};
use crate::LineageError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

/// Serialized form of a [`LineageGraph`]. Node and edge order is insertion
/// order, so a reloaded graph rebuilds identical adjacency lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageDocument {
    pub format_version: u32,
    pub metadata: GraphMetadata,
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageDocument {
    pub fn from_json(json: &str) -> Result<Self, LineageError> {
        let doc: LineageDocument = serde_json::from_str(json)?;
        if doc.format_version != FORMAT_VERSION {
            return Err(LineageError::UnsupportedVersion(doc.format_version));
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, LineageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LineageError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LineageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LineageError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| LineageError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl LineageGraph {
    pub fn to_document(&self) -> LineageDocument {
        LineageDocument {
            format_version: FORMAT_VERSION,
            metadata: self.metadata().clone(),
            nodes: self.nodes().to_vec(),
            edges: self.edges().to_vec(),
        }
    }

    /// Rebuild a graph, re-checking every structural rule on the way in.
    pub fn from_document(doc: LineageDocument) -> Result<Self, LineageError> {
        let mut graph = LineageGraph::new(doc.metadata);
        for node in doc.nodes {
            graph.add_node(node)?;
        }
        for edge in doc.edges {
            graph.add_edge(edge)?;
        }
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded lineage document"
        );
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, LineageError> {
        self.to_document().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self, LineageError> {
        Self::from_document(LineageDocument::from_json(json)?)
    }
}
