//! Heapscope Core - Heap snapshot records
//!
//! This crate defines the validated value types a memory-profiler heap
//! snapshot decodes into, and the functions that read and decode a
//! snapshot from disk or memory.
//!
//! # Example
//!
//! ```no_run
//! use heapscope_core::Snapshot;
//!
//! let snapshot = Snapshot::from_path("heap.json").unwrap();
//! println!("{} nodes, {} edges", snapshot.nodes.len(), snapshot.edges.len());
//! ```

mod error;
mod snapshot;

pub use error::{Result, SnapshotError};
pub use snapshot::{HeapId, RawEdge, RawNode, Snapshot};
