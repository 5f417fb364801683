//! Graph builder for constructing the heap graph from snapshot records.
//!
//! The builder takes raw nodes and edges, drops duplicate (from, to)
//! references and links every kept edge into both endpoints' edge lists.

use crate::edge::HeapEdge;
use crate::error::{GraphError, Result};
use crate::graph::{HeapGraph, HeapNode, NodeId};
use heapscope_core::{HeapId, RawEdge, RawNode, Snapshot};
use petgraph::graph::EdgeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Two edges for the same (from, to) pair that disagree on type or name.
///
/// The first copy is kept in the graph; the later one is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConflict {
    pub kept: HeapEdge,
    pub dropped: HeapEdge,
}

impl EdgeConflict {
    pub fn kind_differs(&self) -> bool {
        self.kept.kind != self.dropped.kind
    }

    pub fn name_differs(&self) -> bool {
        self.kept.name != self.dropped.name
    }
}

/// What the builder saw while constructing the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub node_count: usize,
    /// Sum of every node's own size, in bytes.
    pub total_size: u64,
    /// Edge records in the input, duplicates included.
    pub raw_edge_count: usize,
    /// Edges kept after deduplication.
    pub unique_edge_count: usize,
    pub conflicts: Vec<EdgeConflict>,
}

impl BuildReport {
    /// Edge records dropped as duplicates.
    pub fn duplicate_edge_count(&self) -> usize {
        self.raw_edge_count - self.unique_edge_count
    }
}

/// Builds a HeapGraph from snapshot records.
///
/// Nodes go in first; edges are then resolved against the node index.
/// Each batch is validated before anything is inserted, so a failing call
/// leaves the builder as it was.
pub struct GraphBuilder {
    graph: HeapGraph,
    /// Maps (from, to) pairs to the edge kept for them.
    edge_index: HashMap<(HeapId, HeapId), EdgeIndex>,
    raw_edge_count: usize,
    conflicts: Vec<EdgeConflict>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            graph: HeapGraph::new(),
            edge_index: HashMap::new(),
            raw_edge_count: 0,
            conflicts: Vec::new(),
        }
    }

    /// Builds a graph from a whole snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<(HeapGraph, BuildReport)> {
        let mut builder = Self::new();
        builder.add_nodes(snapshot.nodes)?;
        builder.add_edges(snapshot.edges)?;
        Ok(builder.build())
    }

    /// Adds node records.
    ///
    /// Fails if any id is already present or repeats within the batch.
    pub fn add_nodes(&mut self, nodes: Vec<RawNode>) -> Result<()> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if self.graph.contains(node.id) || !seen.insert(node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
        }

        for node in nodes {
            self.graph.add_node(HeapNode::from(node));
        }

        Ok(())
    }

    /// Adds edge records, dropping duplicate (from, to) pairs.
    ///
    /// Fails if an edge names a node that hasn't been added.
    pub fn add_edges(&mut self, edges: Vec<RawEdge>) -> Result<()> {
        let mut resolved = Vec::with_capacity(edges.len());
        for edge in edges {
            let from = self.resolve_endpoint(&edge, edge.from)?;
            let to = self.resolve_endpoint(&edge, edge.to)?;
            resolved.push((from, to, HeapEdge::from(edge)));
        }

        for (from, to, edge) in resolved {
            self.raw_edge_count += 1;
            self.insert_edge(from, to, edge);
        }

        Ok(())
    }

    fn resolve_endpoint(&self, edge: &RawEdge, id: HeapId) -> Result<NodeId> {
        self.graph
            .get_index(id)
            .ok_or(GraphError::UnknownEdgeEndpoint {
                from: edge.from,
                to: edge.to,
                missing: id,
            })
    }

    fn insert_edge(&mut self, from: NodeId, to: NodeId, edge: HeapEdge) {
        if let Some(&existing) = self.edge_index.get(&edge.key()) {
            let Some(kept) = self.graph.edge(existing) else {
                return;
            };

            debug!("Found duplicate edges: {} / {}", kept, edge);

            if kept.kind != edge.kind || kept.name != edge.name {
                let conflict = EdgeConflict {
                    kept: kept.clone(),
                    dropped: edge,
                };
                if conflict.kind_differs() {
                    warn!(
                        "Edges with different types are connecting nodes {} and {}",
                        conflict.kept.from, conflict.kept.to
                    );
                }
                if conflict.name_differs() {
                    warn!(
                        "Edges with different names are connecting nodes {} and {}",
                        conflict.kept.from, conflict.kept.to
                    );
                }
                self.conflicts.push(conflict);
            }
            return;
        }

        let key = edge.key();
        let index = self.graph.add_edge(from, to, edge);
        self.edge_index.insert(key, index);
    }

    /// Finishes building and returns the graph with its report.
    pub fn build(self) -> (HeapGraph, BuildReport) {
        let report = BuildReport {
            node_count: self.graph.node_count(),
            total_size: self.graph.total_size(),
            raw_edge_count: self.raw_edge_count,
            unique_edge_count: self.graph.edge_count(),
            conflicts: self.conflicts,
        };

        info!(
            "Found {} nodes, total heap size {} bytes",
            report.node_count, report.total_size
        );
        info!(
            "Found {} edges ({} of which are unique)",
            report.raw_edge_count, report.unique_edge_count
        );

        (self.graph, report)
    }
}
