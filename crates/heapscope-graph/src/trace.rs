//! Ancestor and descendant tracing.
//!
//! A depth-first walk from one node through its "from" edges (up) or its
//! "to" edges (down). Each node is reported once, in the order it is first
//! reached, and the walk never descends twice through the same node, so
//! cycles terminate.

use crate::config::QueryConfig;
use crate::edge::TraceDirection;
use crate::error::Result;
use crate::graph::{HeapGraph, NodeId};
use heapscope_core::HeapId;
use petgraph::visit::VisitMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nodes reached from a start node, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub start: HeapId,
    pub direction: TraceDirection,
    /// Visited node ids, start node first.
    pub nodes: Vec<HeapId>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: HeapId) -> bool {
        self.nodes.contains(&id)
    }
}

impl HeapGraph {
    /// Traces ancestors of `start` through "from" edges.
    pub fn trace_up(&self, start: HeapId, config: &QueryConfig) -> Result<Trace> {
        self.trace(start, TraceDirection::Up, config)
    }

    /// Traces descendants of `start` through "to" edges.
    pub fn trace_down(&self, start: HeapId, config: &QueryConfig) -> Result<Trace> {
        self.trace(start, TraceDirection::Down, config)
    }

    /// Depth-first trace from `start` in the given direction.
    ///
    /// Children are pushed in reverse so they pop in list order, which
    /// gives the same pre-order a recursive walk would.
    pub fn trace(
        &self,
        start: HeapId,
        direction: TraceDirection,
        config: &QueryConfig,
    ) -> Result<Trace> {
        let start_index = self.require(start)?;
        let verbose = config.verbose();

        if verbose {
            debug!(
                "Tracing node {} {} (through '{}' edges)",
                start,
                direction,
                direction.edge_list()
            );
        }

        let mut visited = self.markers();
        let mut nodes = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(start_index, 0)];

        while let Some((current, depth)) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };

            if !visited.visit(current) {
                if verbose {
                    debug!(depth, "Already visited node {}, not going there again", node.id);
                }
                continue;
            }

            if verbose {
                debug!(depth, "{}", node);
            }
            nodes.push(node.id);

            let next: Vec<(NodeId, _)> = self.neighbors(current, direction).collect();
            for &(neighbor, edge) in next.iter().rev() {
                if verbose {
                    if let Some(edge) = self.edge(edge) {
                        debug!(depth = depth + 1, "Following {}", edge);
                    }
                }
                stack.push((neighbor, depth + 1));
            }
        }

        if verbose {
            debug!("Trace from {} visited {} nodes", start, nodes.len());
        }

        Ok(Trace {
            start,
            direction,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::error::GraphError;
    use heapscope_core::{RawEdge, RawNode, Snapshot};

    fn build(ids: &[HeapId], edges: &[(HeapId, HeapId)]) -> HeapGraph {
        let snapshot = Snapshot::new(
            ids.iter().map(|&id| RawNode::new(id, "object", 1)).collect(),
            edges
                .iter()
                .map(|&(from, to)| RawEdge::new(from, to, "property"))
                .collect(),
        );
        GraphBuilder::from_snapshot(snapshot).unwrap().0
    }

    fn diamond() -> HeapGraph {
        //     1
        //    / \
        //   2   3
        //    \ /
        //     4
        build(&[1, 2, 3, 4], &[(1, 2), (1, 3), (2, 4), (3, 4)])
    }

    #[test]
    fn test_trace_down_discovery_order() {
        let graph = diamond();
        let trace = graph.trace_down(1, &QueryConfig::default()).unwrap();
        assert_eq!(trace.nodes, vec![1, 2, 4, 3]);
        assert_eq!(trace.direction, TraceDirection::Down);
    }

    #[test]
    fn test_trace_up_discovery_order() {
        let graph = diamond();
        let trace = graph.trace_up(4, &QueryConfig::default()).unwrap();
        assert_eq!(trace.nodes, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_leaf_traces_to_itself() {
        let graph = diamond();
        let trace = graph.trace_down(4, &QueryConfig::default()).unwrap();
        assert_eq!(trace.nodes, vec![4]);
    }

    #[test]
    fn test_cycle_terminates() {
        // 1 → 2 → 3 → 1
        let graph = build(&[1, 2, 3], &[(1, 2), (2, 3), (3, 1)]);
        let trace = graph.trace_down(1, &QueryConfig::default()).unwrap();
        assert_eq!(trace.nodes, vec![1, 2, 3]);

        let trace = graph.trace_up(1, &QueryConfig::default()).unwrap();
        assert_eq!(trace.nodes, vec![1, 3, 2]);
    }

    #[test]
    fn test_repeated_trace_is_identical() {
        let graph = diamond();
        let config = QueryConfig::default();
        let first = graph.trace_down(1, &config).unwrap();
        let second = graph.trace_down(1, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verbosity_does_not_change_result() {
        let graph = diamond();
        let base = QueryConfig::default();
        let quiet = graph.trace_up(4, &base.silenced()).unwrap();
        let loud = graph
            .trace_up(4, &base.with_verbosity(crate::Verbosity::Verbose))
            .unwrap();
        assert_eq!(quiet, loud);
    }

    #[test]
    fn test_missing_start_is_not_found() {
        let graph = diamond();
        let err = graph.trace_up(77, &QueryConfig::default()).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(77));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let ids: Vec<HeapId> = (0..200_000).collect();
        let edges: Vec<(HeapId, HeapId)> = (1..200_000).map(|i| (i - 1, i)).collect();
        let graph = build(&ids, &edges);

        let trace = graph.trace_down(0, &QueryConfig::default()).unwrap();
        assert_eq!(trace.len(), 200_000);
        assert_eq!(trace.nodes.last(), Some(&199_999));
    }
}
