//! Heapscope Graph - Heap reference graph and retention analysis
//!
//! This crate turns a decoded heap snapshot into a graph of objects and
//! references, and answers retention questions over it: who holds a node,
//! what a node holds, what would be freed with it, and how two nodes are
//! connected.
//!
//! # Architecture
//!
//! The graph uses petgraph internally with:
//! - An id index from snapshot ids to graph positions
//! - Ordered "to"/"from" edge lists on every node
//! - At most one edge per (from, to) pair
//!
//! Queries take `&HeapGraph` and keep their visited/retained markers in a
//! bit set of their own, so the graph is never written after it is built.
//!
//! # Example
//!
//! ```no_run
//! use heapscope_core::Snapshot;
//! use heapscope_graph::{GraphBuilder, QueryConfig};
//!
//! let snapshot = Snapshot::from_path("heap.json").unwrap();
//! let (graph, report) = GraphBuilder::from_snapshot(snapshot).unwrap();
//!
//! let config = QueryConfig::default();
//! let retained = graph.retained_set(279536115, &config).unwrap();
//! println!("{}", retained.summary());
//! ```

mod builder;
mod common;
mod config;
mod edge;
mod error;
mod filters;
mod graph;
mod paths;
mod retained;
mod trace;

pub use builder::{BuildReport, EdgeConflict, GraphBuilder};
pub use common::CommonNodes;
pub use config::{QueryConfig, Verbosity, DEFAULT_MAX_PATH_LENGTH, DEFAULT_MAX_QUEUE_LENGTH};
pub use edge::{HeapEdge, TraceDirection};
pub use error::{GraphError, Result};
pub use filters::{EdgeFilter, NodeFilter, DEFAULT_USER_ID_THRESHOLD};
pub use graph::{GraphStats, HeapGraph, HeapNode, NodeId};
pub use paths::{HeapPath, PathSearch};
pub use retained::{RetainedNode, RetainedSet};
pub use trace::Trace;
