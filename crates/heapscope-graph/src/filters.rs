//! Attribute scans over the built graph.
//!
//! These are plain predicates applied to every node or edge in snapshot
//! order. They return every match; deciding what to print is left to the
//! caller.

use crate::edge::HeapEdge;
use crate::graph::{HeapGraph, HeapNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ids below this are usually engine-internal rather than user code.
pub const DEFAULT_USER_ID_THRESHOLD: u64 = 0x100_0000;

/// A predicate over nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum NodeFilter {
    /// Nodes carrying a repr label.
    WithRepr,
    /// Nodes whose repr is one of the given symbols.
    ReprIn { symbols: Vec<String> },
    /// Nodes carrying a source position.
    WithPosition,
    /// Nodes with exactly this type tag.
    OfType {
        #[serde(rename = "type")]
        kind: String,
    },
    /// Nodes nothing refers to.
    Roots,
    /// Nodes that refer to nothing.
    Leaves,
    /// Nodes with no edges at all.
    Unlinked,
    /// Nodes with at least this many outgoing edges.
    ManyTo { at_least: usize },
    /// Nodes with at least this many incoming edges.
    ManyFrom { at_least: usize },
    /// Nodes whose own size is strictly above this many bytes.
    SizeAbove { bytes: u64 },
}

impl NodeFilter {
    pub fn matches(&self, node: &HeapNode) -> bool {
        match self {
            NodeFilter::WithRepr => node.repr_label().is_some(),
            NodeFilter::ReprIn { symbols } => node
                .repr_label()
                .is_some_and(|repr| symbols.iter().any(|s| s == repr)),
            NodeFilter::WithPosition => node.position.is_some(),
            NodeFilter::OfType { kind } => &node.kind == kind,
            NodeFilter::Roots => node.is_root(),
            NodeFilter::Leaves => node.is_leaf(),
            NodeFilter::Unlinked => node.is_root() && node.is_leaf(),
            NodeFilter::ManyTo { at_least } => node.to_count() >= *at_least,
            NodeFilter::ManyFrom { at_least } => node.from_count() >= *at_least,
            NodeFilter::SizeAbove { bytes } => node.size > *bytes,
        }
    }

    /// Whether listings of this filter usually drown in engine-internal
    /// nodes, so that display should skip ids below the user threshold.
    pub fn hides_system_nodes(&self) -> bool {
        matches!(
            self,
            NodeFilter::WithRepr
                | NodeFilter::ReprIn { .. }
                | NodeFilter::Roots
                | NodeFilter::Leaves
                | NodeFilter::Unlinked
                | NodeFilter::ManyTo { .. }
                | NodeFilter::ManyFrom { .. }
        )
    }
}

impl fmt::Display for NodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeFilter::WithRepr => write!(f, "Node(s) with repr"),
            NodeFilter::ReprIn { symbols } => {
                write!(f, "Node(s) with repr in {} symbol(s)", symbols.len())
            }
            NodeFilter::WithPosition => write!(f, "Node(s) with position"),
            NodeFilter::OfType { kind } => write!(f, "Node(s) with type \"{}\"", kind),
            NodeFilter::Roots => write!(f, "Root node(s)"),
            NodeFilter::Leaves => write!(f, "Leaf node(s)"),
            NodeFilter::Unlinked => write!(f, "Unlinked node(s)"),
            NodeFilter::ManyTo { at_least } => {
                write!(f, "Node(s) with at least {} edges to other nodes", at_least)
            }
            NodeFilter::ManyFrom { at_least } => {
                write!(f, "Node(s) with at least {} edges from other nodes", at_least)
            }
            NodeFilter::SizeAbove { bytes } => {
                write!(f, "Node(s) with own size above {} bytes", bytes)
            }
        }
    }
}

/// A predicate over edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum EdgeFilter {
    /// Edges carrying a name.
    WithName,
    /// Edges whose name is one of the given symbols.
    NameIn { symbols: Vec<String> },
}

impl EdgeFilter {
    pub fn matches(&self, edge: &HeapEdge) -> bool {
        match self {
            EdgeFilter::WithName => edge.name_label().is_some(),
            EdgeFilter::NameIn { symbols } => edge
                .name_label()
                .is_some_and(|name| symbols.iter().any(|s| s == name)),
        }
    }
}

impl fmt::Display for EdgeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeFilter::WithName => write!(f, "Edge(s) with name"),
            EdgeFilter::NameIn { symbols } => {
                write!(f, "Edge(s) with name in {} symbol(s)", symbols.len())
            }
        }
    }
}

impl HeapGraph {
    /// All nodes matching `filter`, in snapshot order.
    pub fn filter_nodes(&self, filter: &NodeFilter) -> Vec<&HeapNode> {
        self.nodes().filter(|node| filter.matches(node)).collect()
    }

    /// All edges matching `filter`, in the order they were first seen.
    pub fn filter_edges(&self, filter: &EdgeFilter) -> Vec<&HeapEdge> {
        self.edges().filter(|edge| filter.matches(edge)).collect()
    }
}
