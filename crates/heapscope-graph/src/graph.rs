//! Core graph data structure.
//!
//! The HeapGraph wraps petgraph and adds an id index plus ordered per-node
//! edge lists. It's the structure every query reads.

use crate::edge::{HeapEdge, TraceDirection};
use crate::error::{GraphError, Result};
use heapscope_core::{HeapId, RawNode};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::Visitable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Position of a node inside the graph's storage.
pub type NodeId = NodeIndex;

/// Marker store for one traversal, indexed by node position.
pub(crate) type Markers = <DiGraph<HeapNode, HeapEdge> as Visitable>::Map;

/// A heap object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapNode {
    pub id: HeapId,

    /// Type tag from the snapshot.
    pub kind: String,

    /// Own size in bytes.
    pub size: u64,

    pub repr: Option<String>,

    pub position: Option<serde_json::Value>,

    /// Outgoing edges, in snapshot order.
    #[serde(skip)]
    pub(crate) to: Vec<EdgeIndex>,

    /// Incoming edges, in snapshot order.
    #[serde(skip)]
    pub(crate) from: Vec<EdgeIndex>,
}

impl HeapNode {
    /// Number of edges leaving this node.
    pub fn to_count(&self) -> usize {
        self.to.len()
    }

    /// Number of edges arriving at this node.
    pub fn from_count(&self) -> usize {
        self.from.len()
    }

    /// No edges arrive here.
    pub fn is_root(&self) -> bool {
        self.from.is_empty()
    }

    /// No edges leave here.
    pub fn is_leaf(&self) -> bool {
        self.to.is_empty()
    }

    /// The repr label, if present and non-empty.
    pub fn repr_label(&self) -> Option<&str> {
        self.repr.as_deref().filter(|repr| !repr.is_empty())
    }

    pub(crate) fn edges(&self, direction: TraceDirection) -> &[EdgeIndex] {
        match direction {
            TraceDirection::Up => &self.from,
            TraceDirection::Down => &self.to,
        }
    }
}

impl From<RawNode> for HeapNode {
    fn from(raw: RawNode) -> Self {
        Self {
            id: raw.id,
            kind: raw.kind,
            size: raw.size,
            repr: raw.repr,
            position: raw.position,
            to: Vec::new(),
            from: Vec::new(),
        }
    }
}

impl fmt::Display for HeapNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node id={} type={} size={} from={} to={}",
            self.id,
            self.kind,
            self.size,
            self.from.len(),
            self.to.len()
        )?;
        if let Some(repr) = self.repr_label() {
            write!(f, " repr=\"{}\"", repr)?;
        }
        if let Some(ref position) = self.position {
            write!(f, " position={}", position)?;
        }
        Ok(())
    }
}

/// The heap reference graph.
///
/// Built once by [`crate::GraphBuilder`]; afterwards only read. Queries
/// keep their visited/retained state in their own marker stores.
#[derive(Debug, Default)]
pub struct HeapGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: DiGraph<HeapNode, HeapEdge>,

    /// Maps snapshot ids to graph node indexes.
    id_index: HashMap<HeapId, NodeId>,

    /// Sum of every node's own size.
    total_size: u64,
}

impl HeapGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a node. The caller guarantees its id is not present yet.
    pub(crate) fn add_node(&mut self, node: HeapNode) -> NodeId {
        let id = node.id;
        self.total_size = self.total_size.saturating_add(node.size);
        let index = self.graph.add_node(node);
        self.id_index.insert(id, index);
        index
    }

    /// Adds an edge and appends it to both endpoints' ordered lists.
    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, edge: HeapEdge) -> EdgeIndex {
        let index = self.graph.add_edge(from, to, edge);
        self.graph[from].to.push(index);
        self.graph[to].from.push(index);
        index
    }

    /// Gets the node index for a snapshot id.
    pub fn get_index(&self, id: HeapId) -> Option<NodeId> {
        self.id_index.get(&id).copied()
    }

    /// Like [`get_index`](Self::get_index), but a missing id is an error.
    pub fn require(&self, id: HeapId) -> Result<NodeId> {
        self.get_index(id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Gets a node by its graph index.
    pub fn get(&self, index: NodeId) -> Option<&HeapNode> {
        self.graph.node_weight(index)
    }

    /// Gets a node by its snapshot id.
    pub fn get_by_id(&self, id: HeapId) -> Option<&HeapNode> {
        self.get(self.get_index(id)?)
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: HeapId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Outgoing edges of a node, in snapshot order.
    pub fn outgoing(&self, index: NodeId) -> impl Iterator<Item = &HeapEdge> + '_ {
        self.edge_list(index, TraceDirection::Down)
    }

    /// Incoming edges of a node, in snapshot order.
    pub fn incoming(&self, index: NodeId) -> impl Iterator<Item = &HeapEdge> + '_ {
        self.edge_list(index, TraceDirection::Up)
    }

    fn edge_list(
        &self,
        index: NodeId,
        direction: TraceDirection,
    ) -> impl Iterator<Item = &HeapEdge> + '_ {
        self.graph
            .node_weight(index)
            .map(|node| node.edges(direction))
            .unwrap_or_default()
            .iter()
            .filter_map(move |edge| self.graph.edge_weight(*edge))
    }

    /// Neighbors one hop away, paired with the edge that reaches them.
    ///
    /// `Up` yields each parent through the node's "from" list, `Down` each
    /// child through its "to" list, both in list order.
    pub(crate) fn neighbors(
        &self,
        index: NodeId,
        direction: TraceDirection,
    ) -> impl Iterator<Item = (NodeId, EdgeIndex)> + '_ {
        self.graph
            .node_weight(index)
            .map(|node| node.edges(direction))
            .unwrap_or_default()
            .iter()
            .filter_map(move |&edge| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                let neighbor = match direction {
                    TraceDirection::Up => source,
                    TraceDirection::Down => target,
                };
                Some((neighbor, edge))
            })
    }

    /// Gets an edge by its graph index.
    pub fn edge(&self, index: EdgeIndex) -> Option<&HeapEdge> {
        self.graph.edge_weight(index)
    }

    /// Snapshot id of the node at a graph index.
    pub(crate) fn id_of(&self, index: NodeId) -> Option<HeapId> {
        self.graph.node_weight(index).map(|node| node.id)
    }

    /// A fresh, all-clear marker store sized to this graph.
    pub(crate) fn markers(&self) -> Markers {
        self.graph.visit_map()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of (deduplicated) edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Total own size of all nodes in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Iterates over all nodes, in snapshot order.
    pub fn nodes(&self) -> impl Iterator<Item = &HeapNode> {
        self.graph.node_weights()
    }

    /// Iterates over all edges, in the order they were first seen.
    pub fn edges(&self) -> impl Iterator<Item = &HeapEdge> {
        self.graph.edge_weights()
    }

    /// Iterates over all node indexes.
    pub fn node_indexes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }
}

/// Graph statistics for the summary command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_size: u64,
    pub roots: usize,
    pub leaves: usize,
}

impl HeapGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            total_size: self.total_size,
            roots: self.nodes().filter(|n| n.is_root()).count(),
            leaves: self.nodes().filter(|n| n.is_leaf()).count(),
        }
    }
}
