//! Approximate retained-set analysis.
//!
//! Answers "what would become unreachable if this node went away?" with a
//! single breadth-first pass over "to" edges. A child is retained when all
//! of its parents are already retained at the moment it is first examined.
//! Each child is examined exactly once, so a retaining parent that is only
//! accepted later in the walk does not rescue a child rejected earlier.
//! This under-counts compared to a dominator tree; callers rely on the
//! exact numbers it produces.

use crate::config::QueryConfig;
use crate::edge::TraceDirection;
use crate::error::{GraphError, Result};
use crate::graph::{HeapGraph, Markers, NodeId};
use heapscope_core::HeapId;
use petgraph::visit::VisitMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A node found to be retained, with its BFS depth below the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedNode {
    pub id: HeapId,
    pub depth: usize,
}

/// Result of a retained-set computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedSet {
    pub root: HeapId,
    /// Retained nodes in the order they were accepted, root first.
    pub nodes: Vec<RetainedNode>,
    /// Retained nodes with a non-zero own size.
    pub sized_node_count: usize,
    /// Sum of the retained nodes' own sizes.
    pub retained_size: u64,
    pub max_depth: usize,
    pub max_queue_length: usize,
}

impl RetainedSet {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn ids(&self) -> Vec<HeapId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn contains(&self, id: HeapId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn summary(&self) -> String {
        format!(
            "Retained: {} nodes ({} with non-zero size), {} bytes, max depth {}, max queue {}",
            self.node_count(),
            self.sized_node_count,
            self.retained_size,
            self.max_depth,
            self.max_queue_length
        )
    }
}

impl HeapGraph {
    /// Computes the nodes retained by `root`.
    ///
    /// Fails with [`GraphError::QueueExhausted`] once the pending queue
    /// grows past `config.max_queue_length`.
    pub fn retained_set(&self, root: HeapId, config: &QueryConfig) -> Result<RetainedSet> {
        let root_index = self.require(root)?;
        let verbose = config.verbose();

        let mut visited = self.markers();
        let mut retained = self.markers();
        visited.visit(root_index);
        retained.visit(root_index);

        let root_size = self.get(root_index).map_or(0, |n| n.size);
        let mut result = RetainedSet {
            root,
            nodes: vec![RetainedNode { id: root, depth: 0 }],
            sized_node_count: usize::from(root_size > 0),
            retained_size: root_size,
            max_depth: 0,
            max_queue_length: 1,
        };

        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(root_index, 0)]);

        while !queue.is_empty() {
            result.max_queue_length = result.max_queue_length.max(queue.len());
            if queue.len() > config.max_queue_length {
                warn!(
                    "Retained-set queue for node {} reached {} entries, aborting",
                    root,
                    queue.len()
                );
                return Err(GraphError::QueueExhausted {
                    length: queue.len(),
                    limit: config.max_queue_length,
                });
            }

            let Some((current, depth)) = queue.pop_front() else {
                break;
            };
            let child_depth = depth + 1;

            if verbose {
                if let Some(node) = self.get(current) {
                    debug!(
                        "Considering node {}, searching its {} child(ren)",
                        node.id,
                        node.to_count()
                    );
                }
            }

            for (child, _) in self.neighbors(current, TraceDirection::Down) {
                let Some(child_node) = self.get(child) else {
                    continue;
                };

                if !visited.visit(child) {
                    if verbose {
                        debug!("Child node {} already visited, skipping", child_node.id);
                    }
                    continue;
                }

                if !self.all_parents_retained(child, &retained, verbose) {
                    if verbose {
                        debug!("{} NOT retained", child_node);
                    }
                    continue;
                }

                retained.visit(child);
                result.retained_size = result.retained_size.saturating_add(child_node.size);
                if child_node.size > 0 {
                    result.sized_node_count += 1;
                }
                result.max_depth = result.max_depth.max(child_depth);
                result.nodes.push(RetainedNode {
                    id: child_node.id,
                    depth: child_depth,
                });
                queue.push_back((child, child_depth));

                if verbose {
                    debug!("{} depth={} RETAINED", child_node, child_depth);
                }
            }
        }

        if verbose {
            debug!("{}", result.summary());
        }

        Ok(result)
    }

    fn all_parents_retained(&self, child: NodeId, retained: &Markers, verbose: bool) -> bool {
        self.neighbors(child, TraceDirection::Up)
            .all(|(parent, edge)| {
                let is_retained = retained.is_visited(&parent);
                if verbose {
                    if let Some(edge) = self.edge(edge) {
                        debug!("Parent {} retained={}", edge, is_retained);
                    }
                }
                is_retained
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::config::Verbosity;
    use heapscope_core::{RawEdge, RawNode, Snapshot};

    fn build(nodes: &[(HeapId, u64)], edges: &[(HeapId, HeapId)]) -> HeapGraph {
        let snapshot = Snapshot::new(
            nodes
                .iter()
                .map(|&(id, size)| RawNode::new(id, "object", size))
                .collect(),
            edges
                .iter()
                .map(|&(from, to)| RawEdge::new(from, to, "property"))
                .collect(),
        );
        GraphBuilder::from_snapshot(snapshot).unwrap().0
    }

    fn diamond() -> HeapGraph {
        build(
            &[(1, 10), (2, 0), (3, 5), (4, 0)],
            &[(1, 2), (1, 3), (2, 4), (3, 4)],
        )
    }

    #[test]
    fn test_diamond_from_top_retains_everything() {
        let graph = diamond();
        let result = graph.retained_set(1, &QueryConfig::default()).unwrap();

        assert_eq!(result.ids(), vec![1, 2, 3, 4]);
        assert_eq!(result.retained_size, 15);
        assert_eq!(result.sized_node_count, 2);
        assert_eq!(result.max_depth, 2);
        assert_eq!(result.max_queue_length, 2);
        assert_eq!(result.nodes[3], RetainedNode { id: 4, depth: 2 });
    }

    #[test]
    fn test_diamond_side_retains_only_itself() {
        let graph = diamond();
        let result = graph.retained_set(2, &QueryConfig::default()).unwrap();

        assert_eq!(result.ids(), vec![2]);
        assert_eq!(result.retained_size, 0);
        assert_eq!(result.sized_node_count, 0);
        assert_eq!(result.max_depth, 0);
    }

    #[test]
    fn test_bfs_order_under_counts() {
        // 1 → 2 → 4, 1 → 3 → 5 → 4
        // Node 4 is examined from 2 before 5 has been accepted, so it is
        // rejected and never reconsidered, although 1 dominates it.
        let graph = build(
            &[(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)],
            &[(1, 2), (1, 3), (2, 4), (3, 5), (5, 4)],
        );
        let result = graph.retained_set(1, &QueryConfig::default()).unwrap();

        assert_eq!(result.ids(), vec![1, 2, 3, 5]);
        assert!(!result.contains(4));
        assert_eq!(result.retained_size, 4);
    }

    #[test]
    fn test_external_parent_blocks_retention() {
        // 9 → 2 keeps 2 alive regardless of 1.
        let graph = build(&[(1, 4), (2, 8), (9, 0)], &[(1, 2), (9, 2)]);
        let result = graph.retained_set(1, &QueryConfig::default()).unwrap();
        assert_eq!(result.ids(), vec![1]);
        assert_eq!(result.retained_size, 4);
    }

    #[test]
    fn test_cycle_back_to_root() {
        // 1 → 2 → 1: 2's only parent is the root.
        let graph = build(&[(1, 1), (2, 2)], &[(1, 2), (2, 1)]);
        let result = graph.retained_set(1, &QueryConfig::default()).unwrap();
        assert_eq!(result.ids(), vec![1, 2]);
        assert_eq!(result.retained_size, 3);
    }

    #[test]
    fn test_queue_limit_fails_cleanly() {
        // A root with many children fills the queue in one layer.
        let mut nodes = vec![(0, 1)];
        let mut edges = Vec::new();
        for id in 1..=20 {
            nodes.push((id, 1));
            edges.push((0, id));
        }
        let graph = build(&nodes, &edges);

        let config = QueryConfig::default().with_max_queue_length(5);
        let err = graph.retained_set(0, &config).unwrap_err();
        assert_eq!(err, GraphError::QueueExhausted { length: 20, limit: 5 });

        // The failed run leaves nothing behind.
        let result = graph.retained_set(0, &QueryConfig::default()).unwrap();
        assert_eq!(result.node_count(), 21);
        assert_eq!(result.max_queue_length, 20);
    }

    #[test]
    fn test_repeated_runs_agree() {
        let graph = diamond();
        let config = QueryConfig::default();
        let first = graph.retained_set(1, &config).unwrap();
        let second = graph.retained_set(1, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verbosity_does_not_change_result() {
        let graph = build(
            &[(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)],
            &[(1, 2), (1, 3), (2, 4), (3, 5), (5, 4)],
        );
        let silent = QueryConfig::default().with_verbosity(Verbosity::Silent);
        let verbose = QueryConfig::default().with_verbosity(Verbosity::Verbose);

        for root in [1, 3, 4] {
            assert_eq!(
                graph.retained_set(root, &silent).unwrap(),
                graph.retained_set(root, &verbose).unwrap()
            );
        }

        let limited = |config: QueryConfig| config.with_max_queue_length(1);
        assert_eq!(
            graph.retained_set(1, &limited(silent)).unwrap_err(),
            graph.retained_set(1, &limited(verbose)).unwrap_err()
        );
    }

    #[test]
    fn test_retained_size_saturates() {
        let graph = build(&[(1, u64::MAX), (2, 1), (3, 7)], &[(1, 2), (2, 3)]);
        let result = graph.retained_set(1, &QueryConfig::default()).unwrap();

        assert_eq!(result.ids(), vec![1, 2, 3]);
        assert_eq!(result.retained_size, u64::MAX);
        assert_eq!(result.sized_node_count, 3);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let graph = diamond();
        let err = graph.retained_set(5, &QueryConfig::default()).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(5));
    }
}
