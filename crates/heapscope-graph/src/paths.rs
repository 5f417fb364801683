//! Bounded path search between two nodes.
//!
//! The search ignores edge direction when choosing where to go next (it
//! follows a node's "from" edges, then its "to" edges), but every hop in a
//! reported path carries the real edge so the direction is not lost.
//!
//! One visited set covers the whole search. A node reached along one path
//! is never expanded again along another, so the result is the set of
//! paths in a single depth-first tree, not every simple path.

use crate::config::QueryConfig;
use crate::edge::{HeapEdge, TraceDirection};
use crate::error::Result;
use crate::graph::{HeapGraph, NodeId};
use heapscope_core::HeapId;
use petgraph::graph::EdgeIndex;
use petgraph::visit::VisitMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A path from the search start to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapPath {
    /// Node ids from start to target.
    pub nodes: Vec<HeapId>,
    /// The edge crossed between each consecutive pair of nodes.
    pub hops: Vec<HeapEdge>,
}

impl HeapPath {
    /// Length in nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for HeapPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path =")?;
        for id in &self.nodes {
            write!(f, " {}", id)?;
        }
        Ok(())
    }
}

/// Result of a path search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSearch {
    pub start: HeapId,
    pub target: HeapId,
    /// The cap that was applied, in nodes.
    pub max_length: usize,
    pub paths: Vec<HeapPath>,
    /// Path ends that were examined.
    pub paths_searched: usize,
}

impl PathSearch {
    pub fn paths_found(&self) -> usize {
        self.paths.len()
    }
}

/// One candidate path end, linked to the frame it extends.
struct Frame {
    node: NodeId,
    parent: Option<usize>,
    via: Option<EdgeIndex>,
    length: usize,
}

impl HeapGraph {
    /// Finds paths from `start` to `target` of at most `max_length` nodes.
    ///
    /// `max_length` defaults to `config.max_path_length`; values below one
    /// are treated as one. A target id missing from the graph simply yields
    /// no paths.
    pub fn find_paths(
        &self,
        start: HeapId,
        target: HeapId,
        max_length: Option<usize>,
        config: &QueryConfig,
    ) -> Result<PathSearch> {
        let start_index = self.require(start)?;
        let target_index = self.get_index(target);
        let max_length = max_length.unwrap_or(config.max_path_length).max(1);
        let verbose = config.verbose();

        if target_index.is_none() && verbose {
            debug!("Target node {} is not in the graph", target);
        }

        let mut visited = self.markers();
        let mut frames = vec![Frame {
            node: start_index,
            parent: None,
            via: None,
            length: 1,
        }];
        let mut stack = vec![0usize];
        let mut paths = Vec::new();
        let mut paths_searched = 0;

        while let Some(slot) = stack.pop() {
            let Some(frame) = frames.get(slot) else {
                continue;
            };
            let (current, length) = (frame.node, frame.length);

            if verbose {
                debug!("Considering {}", self.path_to(&frames, slot));
            }

            if !visited.visit(current) {
                if verbose {
                    debug!("Already visited this node, not going there again");
                }
                continue;
            }
            paths_searched += 1;

            if Some(current) == target_index {
                let path = self.path_to(&frames, slot);
                if verbose {
                    debug!("Path found: {}", path);
                }
                paths.push(path);
                continue;
            }

            if length >= max_length {
                if verbose {
                    debug!("Not extending, path is at the maximum length of {}", max_length);
                }
                continue;
            }

            let next: Vec<(NodeId, EdgeIndex)> = self
                .neighbors(current, TraceDirection::Up)
                .chain(self.neighbors(current, TraceDirection::Down))
                .collect();

            for (neighbor, edge) in next.into_iter().rev() {
                stack.push(frames.len());
                frames.push(Frame {
                    node: neighbor,
                    parent: Some(slot),
                    via: Some(edge),
                    length: length + 1,
                });
            }
        }

        if verbose {
            debug!(
                "{} path(s) searched, {} path(s) found between {} and {}",
                paths_searched,
                paths.len(),
                start,
                target
            );
        }

        Ok(PathSearch {
            start,
            target,
            max_length,
            paths,
            paths_searched,
        })
    }

    /// Rebuilds the path ending at `slot` by walking parent links.
    fn path_to(&self, frames: &[Frame], slot: usize) -> HeapPath {
        let mut nodes = Vec::new();
        let mut hops = Vec::new();
        let mut cursor = Some(slot);

        while let Some(frame) = cursor.and_then(|i| frames.get(i)) {
            if let Some(id) = self.id_of(frame.node) {
                nodes.push(id);
            }
            if let Some(edge) = frame.via.and_then(|e| self.edge(e)) {
                hops.push(edge.clone());
            }
            cursor = frame.parent;
        }

        nodes.reverse();
        hops.reverse();
        HeapPath { nodes, hops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::config::Verbosity;
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

    #[test]
    fn test_path_to_self() {
        let graph = build(&[1, 2], &[(1, 2)]);
        let search = graph
            .find_paths(1, 1, None, &QueryConfig::default())
            .unwrap();

        assert_eq!(search.paths_found(), 1);
        assert_eq!(search.paths[0].nodes, vec![1]);
        assert!(search.paths[0].hops.is_empty());
        assert_eq!(search.paths_searched, 1);
    }

    #[test]
    fn test_path_against_edge_direction() {
        // 2 → 1 and 2 → 3: 1 and 3 are only connected through a shared parent.
        let graph = build(&[1, 2, 3], &[(2, 1), (2, 3)]);
        let search = graph
            .find_paths(1, 3, None, &QueryConfig::default())
            .unwrap();

        assert_eq!(search.paths_found(), 1);
        let path = &search.paths[0];
        assert_eq!(path.nodes, vec![1, 2, 3]);
        assert_eq!(path.hops[0].from, 2);
        assert_eq!(path.hops[0].to, 1);
        assert_eq!(path.hops[1].from, 2);
        assert_eq!(path.hops[1].to, 3);
        assert_eq!(path.to_string(), "path = 1 2 3");
    }

    #[test]
    fn test_shared_substructure_reports_first_path_only() {
        // Diamond: two routes from 1 to 4, but 4 is marked visited after
        // the first one reaches it.
        let graph = build(&[1, 2, 3, 4], &[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let search = graph
            .find_paths(1, 4, None, &QueryConfig::default())
            .unwrap();

        assert_eq!(search.paths_found(), 1);
        assert_eq!(search.paths[0].nodes, vec![1, 2, 4]);
    }

    #[test]
    fn test_length_cap() {
        // 1 → 2 → 3 → 4 → 5
        let graph = build(&[1, 2, 3, 4, 5], &[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let config = QueryConfig::default();

        let search = graph.find_paths(1, 5, Some(4), &config).unwrap();
        assert_eq!(search.paths_found(), 0);
        assert_eq!(search.paths_searched, 4);
        assert_eq!(search.max_length, 4);

        let search = graph.find_paths(1, 5, Some(5), &config).unwrap();
        assert_eq!(search.paths_found(), 1);
        assert_eq!(search.paths[0].len(), 5);
    }

    #[test]
    fn test_cap_from_config() {
        let graph = build(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let config = QueryConfig::default().with_max_path_length(2);
        let search = graph.find_paths(1, 3, None, &config).unwrap();
        assert_eq!(search.paths_found(), 0);
        assert_eq!(search.max_length, 2);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let graph = build(&[1, 2], &[(1, 2)]);
        let search = graph
            .find_paths(1, 2, Some(0), &QueryConfig::default())
            .unwrap();
        assert_eq!(search.max_length, 1);
        assert_eq!(search.paths_found(), 0);
        assert_eq!(search.paths_searched, 1);
    }

    #[test]
    fn test_disconnected_target() {
        let graph = build(&[1, 2, 3], &[(1, 2)]);
        let search = graph
            .find_paths(1, 3, None, &QueryConfig::default())
            .unwrap();
        assert_eq!(search.paths_found(), 0);
        assert_eq!(search.paths_searched, 2);
    }

    #[test]
    fn test_missing_target_searches_without_error() {
        let graph = build(&[1, 2], &[(1, 2)]);
        let search = graph
            .find_paths(1, 42, None, &QueryConfig::default())
            .unwrap();
        assert_eq!(search.paths_found(), 0);
        assert!(search.paths_searched > 0);
    }

    #[test]
    fn test_verbosity_does_not_change_result() {
        // Two routes from 1 to 4, plus a cycle through 5.
        let graph = build(
            &[1, 2, 3, 4, 5],
            &[(1, 2), (2, 4), (1, 3), (3, 4), (4, 5), (5, 1)],
        );
        let silent = QueryConfig::default().with_verbosity(Verbosity::Silent);
        let verbose = QueryConfig::default().with_verbosity(Verbosity::Verbose);

        for (target, cap) in [(4, None), (4, Some(2)), (5, Some(3)), (9, None)] {
            assert_eq!(
                graph.find_paths(1, target, cap, &silent).unwrap(),
                graph.find_paths(1, target, cap, &verbose).unwrap()
            );
        }
    }

    #[test]
    fn test_missing_start_is_not_found() {
        let graph = build(&[1], &[]);
        let err = graph
            .find_paths(8, 1, None, &QueryConfig::default())
            .unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(8));
    }
}
