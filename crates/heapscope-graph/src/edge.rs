//! Edge types for the heap graph.
//!
//! An edge is a reference from one heap object to another: a property, a
//! closure variable, an internal slot. Identity is the (from, to) pair;
//! the builder keeps at most one edge per pair.

use heapscope_core::{HeapId, RawEdge};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference between two heap nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapEdge {
    /// Id of the referencing node.
    pub from: HeapId,

    /// Id of the referenced node.
    pub to: HeapId,

    /// Reference kind tag from the snapshot.
    pub kind: String,

    /// Property or variable name, if any.
    pub name: Option<String>,
}

impl HeapEdge {
    /// Creates an unnamed edge.
    pub fn new(from: HeapId, to: HeapId, kind: impl Into<String>) -> Self {
        Self {
            from,
            to,
            kind: kind.into(),
            name: None,
        }
    }

    /// The name, if present and non-empty.
    pub fn name_label(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// The (from, to) pair that identifies this edge.
    pub fn key(&self) -> (HeapId, HeapId) {
        (self.from, self.to)
    }
}

impl From<RawEdge> for HeapEdge {
    fn from(raw: RawEdge) -> Self {
        Self {
            from: raw.from,
            to: raw.to,
            kind: raw.kind,
            name: raw.name,
        }
    }
}

impl fmt::Display for HeapEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge type={} from={} to={}", self.kind, self.from, self.to)?;
        if let Some(name) = self.name_label() {
            write!(f, " name={}", name)?;
        }
        Ok(())
    }
}

/// Which way a traversal follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceDirection {
    /// Towards ancestors, through "from" edges.
    Up,
    /// Towards descendants, through "to" edges.
    Down,
}

impl TraceDirection {
    /// The edge list this direction walks.
    pub fn edge_list(self) -> &'static str {
        match self {
            TraceDirection::Up => "from",
            TraceDirection::Down => "to",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceDirection::Up => write!(f, "up"),
            TraceDirection::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for TraceDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "from" => Ok(TraceDirection::Up),
            "down" | "to" => Ok(TraceDirection::Down),
            other => Err(format!("unknown direction '{}', expected up or down", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_display() {
        let mut edge = HeapEdge::new(1, 2, "property");
        assert_eq!(edge.to_string(), "edge type=property from=1 to=2");

        edge.name = Some("items".to_string());
        assert_eq!(edge.to_string(), "edge type=property from=1 to=2 name=items");
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("up".parse::<TraceDirection>(), Ok(TraceDirection::Up));
        assert_eq!("TO".parse::<TraceDirection>(), Ok(TraceDirection::Down));
        assert!("sideways".parse::<TraceDirection>().is_err());
    }
}
