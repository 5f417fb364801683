use heapscope_core::HeapId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge {from} -> {to} references unknown node {missing}")]
    UnknownEdgeEndpoint {
        from: HeapId,
        to: HeapId,
        missing: HeapId,
    },

    #[error("node {0} appears more than once in the snapshot")]
    DuplicateNode(HeapId),

    #[error("can't find node with id={0}")]
    NodeNotFound(HeapId),

    #[error("search queue reached {length} entries, over the limit of {limit}")]
    QueueExhausted { length: usize, limit: usize },
}

impl GraphError {
    /// Whether the failure is confined to one query.
    ///
    /// Build failures are not: they leave no graph to query.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            GraphError::NodeNotFound(_) | GraphError::QueueExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
