//! Common ancestors and descendants of two nodes.

use crate::config::QueryConfig;
use crate::edge::TraceDirection;
use crate::error::Result;
use crate::graph::HeapGraph;
use heapscope_core::HeapId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Nodes reachable from both of two start nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonNodes {
    pub first: HeapId,
    pub second: HeapId,
    pub direction: TraceDirection,
    /// Shared ids, in the first node's trace order.
    pub nodes: Vec<HeapId>,
}

impl HeapGraph {
    /// Nodes reachable through "from" edges of both `first` and `second`.
    pub fn find_common_from(
        &self,
        first: HeapId,
        second: HeapId,
        config: &QueryConfig,
    ) -> Result<CommonNodes> {
        self.find_common(first, second, TraceDirection::Up, config)
    }

    /// Nodes reachable through "to" edges of both `first` and `second`.
    pub fn find_common_to(
        &self,
        first: HeapId,
        second: HeapId,
        config: &QueryConfig,
    ) -> Result<CommonNodes> {
        self.find_common(first, second, TraceDirection::Down, config)
    }

    /// Intersects the traces of two nodes in one direction.
    ///
    /// The inner traces run silenced whatever `config` says.
    pub fn find_common(
        &self,
        first: HeapId,
        second: HeapId,
        direction: TraceDirection,
        config: &QueryConfig,
    ) -> Result<CommonNodes> {
        let inner = config.silenced();
        let first_trace = self.trace(first, direction, &inner)?;
        let second_trace = self.trace(second, direction, &inner)?;

        let reachable: HashSet<HeapId> = second_trace.nodes.into_iter().collect();
        let nodes: Vec<HeapId> = first_trace
            .nodes
            .into_iter()
            .filter(|id| reachable.contains(id))
            .collect();

        if config.verbose() {
            debug!(
                "{} node(s) reachable {} from both {} and {}",
                nodes.len(),
                direction,
                first,
                second
            );
        }

        Ok(CommonNodes {
            first,
            second,
            direction,
            nodes,
        })
    }
}
