//! Snapshot records.
//!
//! A snapshot is decoded wholesale into a [`Snapshot`]. Required fields are
//! enforced by the types themselves: a node without an `id`, `size` or
//! `type`, or an edge without `from`, `to` or `type`, fails decoding rather
//! than producing a half-filled record.

use crate::error::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Identifier of a node within a snapshot.
pub type HeapId = u64;

/// A node record as it appears in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: HeapId,

    /// Own size in bytes.
    pub size: u64,

    /// Type tag such as `object`, `Closure`, `Code` or `Sourcemap`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display label, usually a variable name or string literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repr: Option<String>,

    /// Source location. The profiler's shape varies, so it is kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<serde_json::Value>,
}

impl RawNode {
    /// Creates a node record with no repr or position.
    pub fn new(id: HeapId, kind: impl Into<String>, size: u64) -> Self {
        Self {
            id,
            size,
            kind: kind.into(),
            repr: None,
            position: None,
        }
    }

    /// Attaches a display label.
    pub fn with_repr(mut self, repr: impl Into<String>) -> Self {
        self.repr = Some(repr.into());
        self
    }

    /// Attaches a source position.
    pub fn with_position(mut self, position: serde_json::Value) -> Self {
        self.position = Some(position);
        self
    }
}

/// An edge record as it appears in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub from: HeapId,
    pub to: HeapId,

    /// Reference kind such as `property`, `variable` or `internal`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Property or variable name, when the reference has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RawEdge {
    /// Creates an unnamed edge record.
    pub fn new(from: HeapId, to: HeapId, kind: impl Into<String>) -> Self {
        Self {
            from,
            to,
            kind: kind.into(),
            name: None,
        }
    }

    /// Attaches a property or variable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A decoded heap snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

impl Snapshot {
    /// Creates a snapshot from already-decoded records.
    pub fn new(nodes: Vec<RawNode>, edges: Vec<RawEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Decodes a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes a snapshot from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads and decodes a snapshot file in one blocking step.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Read {} bytes from {}", bytes.len(), path.display());

        Self::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SMALL: &str = r#"{
        "nodes": [
            {"id": 1, "size": 10, "type": "object", "repr": "myObject"},
            {"id": 2, "size": 0, "type": "Closure", "position": {"line": 3, "column": 7}}
        ],
        "edges": [
            {"from": 1, "to": 2, "type": "property", "name": "callback"}
        ]
    }"#;

    #[test]
    fn test_decode_small_snapshot() {
        let snapshot = Snapshot::from_json(SMALL).unwrap();

        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.nodes[0].repr.as_deref(), Some("myObject"));
        assert_eq!(snapshot.nodes[1].kind, "Closure");
        assert!(snapshot.nodes[1].position.is_some());
        assert_eq!(snapshot.edges[0].name.as_deref(), Some("callback"));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let text = r#"{"nodes": [{"id": 1, "type": "object"}], "edges": []}"#;
        let err = Snapshot::from_json(text).unwrap_err();
        assert!(matches!(err, SnapshotError::Decode(_)));
        assert!(err.to_string().contains("size"));
    }

    #[test]
    fn test_edge_without_type_fails() {
        let text = r#"{"nodes": [], "edges": [{"from": 1, "to": 2}]}"#;
        assert!(Snapshot::from_json(text).is_err());
    }

    #[test]
    fn test_negative_id_fails() {
        let text = r#"{"nodes": [{"id": -4, "size": 0, "type": "object"}], "edges": []}"#;
        assert!(Snapshot::from_json(text).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let text = r#"{
            "version": 2,
            "nodes": [{"id": 7, "size": 1, "type": "string", "extra": true}],
            "edges": []
        }"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        assert_eq!(snapshot.nodes[0].id, 7);
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();

        let snapshot = Snapshot::from_path(file.path()).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn test_builders() {
        let node = RawNode::new(3, "string", 12).with_repr("hello");
        assert_eq!(node.repr.as_deref(), Some("hello"));

        let edge = RawEdge::new(1, 3, "variable").with_name("greeting");
        assert_eq!(edge.name.as_deref(), Some("greeting"));
    }
}
