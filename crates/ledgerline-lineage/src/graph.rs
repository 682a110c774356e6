//! Arena-backed lineage graph.
//!
//! Nodes and edges live in insertion-ordered vectors; ids map to arena slots
//! and per-node adjacency lists hold edge slots. Nothing is ever removed, so
//! slots stay stable for the life of the graph.

use crate::model::{EdgeId, EdgeKind, LineageEdge, LineageNode, NodeId, NodeKind};
use crate::LineageError;
use chrono::{DateTime, Utc};
use ledgerline_confidence::{AggregationStrategy, Confidence, ResolutionTier};
use ledgerline_taxonomy::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Session-level facts recorded alongside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub session_id: String,
    #[serde(default)]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GraphMetadata {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            source: None,
            created_at: Utc::now(),
        }
    }
}

/// Options for backward and forward traces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceOptions {
    pub include_inactive: bool,
    /// Hops from the start node; `None` is unbounded.
    pub max_depth: Option<usize>,
}

impl TraceOptions {
    pub fn all_edges() -> Self {
        Self {
            include_inactive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Source to target.
    Downstream,
    /// Target to source.
    Upstream,
}

/// One hop of a path: leave `from` over `edge` in `direction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub from: NodeId,
    pub edge: EdgeId,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub active_edges: usize,
    pub inactive_edges: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    pub mapping_tiers: BTreeMap<ResolutionTier, usize>,
    pub aggregation_strategies: BTreeMap<AggregationStrategy, usize>,
    /// Mean confidence of active edges; `None` without active edges.
    pub mean_active_confidence: Option<f64>,
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone)]
pub struct LineageGraph {
    metadata: GraphMetadata,
    nodes: Vec<LineageNode>,
    edges: Vec<LineageEdge>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    /// node slot -> edge slots where the node is a source
    outgoing: Vec<Vec<usize>>,
    /// node slot -> edge slots where the node is the target
    incoming: Vec<Vec<usize>>,
}

impl LineageGraph {
    pub fn new(metadata: GraphMetadata) -> Self {
        Self {
            metadata,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.metadata.source = Some(source.into());
    }

    pub fn nodes(&self) -> &[LineageNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LineageEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, node: LineageNode) -> Result<(), LineageError> {
        if self.node_index.contains_key(&node.id) {
            return Err(LineageError::DuplicateNode(node.id.to_string()));
        }
        let slot = self.nodes.len();
        self.node_index.insert(node.id.clone(), slot);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(())
    }

    /// Insert an edge. Every endpoint must exist and the edge must not close
    /// a cycle, counting inactive edges too.
    pub fn add_edge(&mut self, edge: LineageEdge) -> Result<(), LineageError> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(LineageError::DuplicateEdge(edge.id.to_string()));
        }
        if edge.sources.is_empty() {
            return Err(LineageError::EmptySources(edge.id.to_string()));
        }
        let target = self.slot(&edge.target)?;
        let mut sources = Vec::with_capacity(edge.sources.len());
        for source in &edge.sources {
            let slot = self.slot(source)?;
            if !sources.contains(&slot) {
                sources.push(slot);
            }
        }
        for excluded in &edge.excluded_sources {
            self.slot(excluded)?;
        }

        // A cycle appears iff some source is reachable from the target.
        if sources.contains(&target) || self.reaches_any(target, &sources) {
            return Err(LineageError::CycleDetected {
                edge: edge.id.to_string(),
                target: edge.target.to_string(),
            });
        }

        let edge_slot = self.edges.len();
        self.edge_index.insert(edge.id.clone(), edge_slot);
        for source in sources {
            self.outgoing[source].push(edge_slot);
        }
        self.incoming[target].push(edge_slot);
        self.edges.push(edge);
        Ok(())
    }

    fn reaches_any(&self, from: usize, goals: &[usize]) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        seen[from] = true;
        while let Some(slot) = stack.pop() {
            if goals.contains(&slot) {
                return true;
            }
            for &edge in &self.outgoing[slot] {
                let next = self.node_index[&self.edges[edge].target];
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        false
    }

    fn slot(&self, id: &NodeId) -> Result<usize, LineageError> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| LineageError::NodeNotFound(id.to_string()))
    }

    fn edge_slot(&self, id: &EdgeId) -> Result<usize, LineageError> {
        self.edge_index
            .get(id)
            .copied()
            .ok_or_else(|| LineageError::EdgeNotFound(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn get_node(&self, id: &NodeId) -> Result<&LineageNode, LineageError> {
        Ok(&self.nodes[self.slot(id)?])
    }

    pub fn get_edge(&self, id: &EdgeId) -> Result<&LineageEdge, LineageError> {
        Ok(&self.edges[self.edge_slot(id)?])
    }

    pub fn query_nodes_by_kind(&self, kind: NodeKind) -> Vec<&LineageNode> {
        self.nodes.iter().filter(|n| n.kind == kind).collect()
    }

    pub fn query_nodes_by_concept(
        &self,
        concept: &ConceptId,
        period: Option<&str>,
    ) -> Vec<&LineageNode> {
        self.nodes
            .iter()
            .filter(|n| n.concept.as_ref() == Some(concept))
            .filter(|n| period.map_or(true, |p| n.period.as_deref() == Some(p)))
            .collect()
    }

    pub fn query_node_by_cell(&self, sheet: &str, row: u32, col: u32) -> Option<&LineageNode> {
        self.nodes.iter().find(|n| {
            n.kind == NodeKind::SourceCell
                && n.cell
                    .as_ref()
                    .is_some_and(|c| c.sheet == sheet && c.row == row && c.col == col)
        })
    }

    /// Edges entering `id`, in insertion order.
    pub fn incoming_edges(
        &self,
        id: &NodeId,
        include_inactive: bool,
    ) -> Result<Vec<&LineageEdge>, LineageError> {
        let slot = self.slot(id)?;
        Ok(self.incoming[slot]
            .iter()
            .map(|&e| &self.edges[e])
            .filter(|e| include_inactive || e.active)
            .collect())
    }

    /// Edges leaving `id`, in insertion order.
    pub fn outgoing_edges(
        &self,
        id: &NodeId,
        include_inactive: bool,
    ) -> Result<Vec<&LineageEdge>, LineageError> {
        let slot = self.slot(id)?;
        Ok(self.outgoing[slot]
            .iter()
            .map(|&e| &self.edges[e])
            .filter(|e| include_inactive || e.active)
            .collect())
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Ancestors of `id` in breadth-first order, excluding `id` itself.
    pub fn trace_backward(
        &self,
        id: &NodeId,
        options: TraceOptions,
    ) -> Result<Vec<&LineageNode>, LineageError> {
        let start = self.slot(id)?;
        Ok(self
            .bfs(start, options, |slot| {
                self.incoming[slot]
                    .iter()
                    .flat_map(|&e| self.edges[e].sources.iter().map(move |s| (e, s)))
                    .map(|(e, s)| (e, self.node_index[s]))
                    .collect()
            })
            .into_iter()
            .map(|slot| &self.nodes[slot])
            .collect())
    }

    /// Descendants of `id` in breadth-first order, excluding `id` itself.
    pub fn trace_forward(
        &self,
        id: &NodeId,
        options: TraceOptions,
    ) -> Result<Vec<&LineageNode>, LineageError> {
        let start = self.slot(id)?;
        Ok(self
            .bfs(start, options, |slot| {
                self.outgoing[slot]
                    .iter()
                    .map(|&e| (e, self.node_index[&self.edges[e].target]))
                    .collect()
            })
            .into_iter()
            .map(|slot| &self.nodes[slot])
            .collect())
    }

    fn bfs<F>(&self, start: usize, options: TraceOptions, neighbours: F) -> Vec<usize>
    where
        F: Fn(usize) -> Vec<(usize, usize)>,
    {
        let mut seen = vec![false; self.nodes.len()];
        seen[start] = true;
        let mut order = Vec::new();
        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((slot, depth)) = queue.pop_front() {
            if options.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for (edge, next) in neighbours(slot) {
                if !options.include_inactive && !self.edges[edge].active {
                    continue;
                }
                if !seen[next] {
                    seen[next] = true;
                    order.push(next);
                    queue.push_back((next, depth + 1));
                }
            }
        }
        order
    }

    /// Shortest path over active edges.
    ///
    /// Tries downstream edges first, then upstream, then either direction.
    /// `None` iff an endpoint is unknown or the two nodes are not connected;
    /// a node reaches itself with an empty path.
    pub fn find_path(&self, from: &NodeId, to: &NodeId) -> Option<Vec<PathStep>> {
        let start = *self.node_index.get(from)?;
        let goal = *self.node_index.get(to)?;
        if start == goal {
            return Some(Vec::new());
        }
        for (downstream, upstream) in [(true, false), (false, true), (true, true)] {
            if let Some(path) = self.shortest_path(start, goal, downstream, upstream) {
                return Some(path);
            }
        }
        None
    }

    fn shortest_path(
        &self,
        start: usize,
        goal: usize,
        downstream: bool,
        upstream: bool,
    ) -> Option<Vec<PathStep>> {
        // node slot -> (previous node slot, edge slot, direction)
        let mut previous: HashMap<usize, (usize, usize, Direction)> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(slot) = queue.pop_front() {
            if slot == goal {
                break;
            }
            let mut hops = Vec::new();
            if downstream {
                for &e in &self.outgoing[slot] {
                    hops.push((e, self.node_index[&self.edges[e].target], Direction::Downstream));
                }
            }
            if upstream {
                for &e in &self.incoming[slot] {
                    for source in &self.edges[e].sources {
                        hops.push((e, self.node_index[source], Direction::Upstream));
                    }
                }
            }
            for (edge, next, direction) in hops {
                if !self.edges[edge].active || !seen.insert(next) {
                    continue;
                }
                previous.insert(next, (slot, edge, direction));
                queue.push_back(next);
            }
        }

        if !previous.contains_key(&goal) {
            return None;
        }
        let mut steps = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let (prev, edge, direction) = previous[&cursor];
            steps.push(PathStep {
                from: self.nodes[prev].id.clone(),
                edge: self.edges[edge].id.clone(),
                direction,
            });
            cursor = prev;
        }
        steps.reverse();
        Some(steps)
    }

    // ------------------------------------------------------------------
    // Mutation (activity only)
    // ------------------------------------------------------------------

    pub fn deactivate_edge(&mut self, id: &EdgeId, reason: &str) -> Result<(), LineageError> {
        let slot = self.edge_slot(id)?;
        let edge = &mut self.edges[slot];
        edge.active = false;
        edge.condition = Some(reason.to_string());
        tracing::debug!(edge = %id, reason, "deactivated lineage edge");
        Ok(())
    }

    /// Deactivate `old` in favour of `replacement`.
    pub fn supersede_edge(
        &mut self,
        old: &EdgeId,
        replacement: &EdgeId,
        reason: &str,
    ) -> Result<(), LineageError> {
        self.edge_slot(replacement)?;
        if old == replacement {
            return Err(LineageError::InvalidSupersede(old.to_string()));
        }
        let slot = self.edge_slot(old)?;
        let edge = &mut self.edges[slot];
        edge.active = false;
        edge.condition = Some(format!("Superseded by {replacement}: {reason}"));
        edge.superseded_by = Some(replacement.clone());
        tracing::debug!(edge = %old, replacement = %replacement, "superseded lineage edge");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit queries
    // ------------------------------------------------------------------

    /// Aggregated nodes whose inputs include excluded (inactive) edges.
    pub fn query_aggregations_with_conflicts(&self) -> Vec<(&LineageNode, Vec<&LineageEdge>)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Aggregated)
            .filter_map(|(slot, node)| {
                let excluded: Vec<&LineageEdge> = self.incoming[slot]
                    .iter()
                    .map(|&e| &self.edges[e])
                    .filter(|e| e.kind == EdgeKind::Aggregation && !e.active)
                    .collect();
                (!excluded.is_empty()).then_some((node, excluded))
            })
            .collect()
    }

    /// Active mappings that came from a user override.
    pub fn query_override_mappings(&self) -> Vec<(&LineageNode, &LineageEdge)> {
        self.active_mappings()
            .filter(|(_, e)| e.tier == Some(ResolutionTier::Override))
            .collect()
    }

    /// Active mappings below `threshold`.
    pub fn query_low_confidence_mappings(
        &self,
        threshold: Confidence,
    ) -> Vec<(&LineageNode, &LineageEdge)> {
        self.active_mappings()
            .filter(|(_, e)| e.confidence < threshold)
            .collect()
    }

    pub(crate) fn active_mappings(&self) -> impl Iterator<Item = (&LineageNode, &LineageEdge)> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Mapping && e.active)
            .filter_map(|e| {
                self.node_index
                    .get(&e.target)
                    .map(|&slot| (&self.nodes[slot], e))
            })
    }

    pub fn statistics(&self) -> GraphStatistics {
        let mut nodes_by_kind = BTreeMap::new();
        for node in &self.nodes {
            *nodes_by_kind.entry(node.kind).or_insert(0) += 1;
        }

        let mut edges_by_kind = BTreeMap::new();
        let mut mapping_tiers = BTreeMap::new();
        let mut aggregation_strategies = BTreeMap::new();
        let mut active = 0usize;
        let mut confidence_sum = 0.0;
        for edge in &self.edges {
            *edges_by_kind.entry(edge.kind).or_insert(0) += 1;
            if let Some(tier) = edge.tier {
                *mapping_tiers.entry(tier).or_insert(0) += 1;
            }
            if let Some(strategy) = edge.strategy {
                *aggregation_strategies.entry(strategy).or_insert(0) += 1;
            }
            if edge.active {
                active += 1;
                confidence_sum += edge.confidence.value();
            }
        }

        GraphStatistics {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            active_edges: active,
            inactive_edges: self.edges.len() - active,
            nodes_by_kind,
            edges_by_kind,
            mapping_tiers,
            aggregation_strategies,
            mean_active_confidence: (active > 0).then(|| confidence_sum / active as f64),
        }
    }
}
