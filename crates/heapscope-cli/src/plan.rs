//! Analysis plans.
//!
//! A plan is a JSON file listing the queries `heapscope analyze` runs, in
//! order, against one snapshot. Every field is optional; a missing
//! `queries` list falls back to the standard set of listings.

use heapscope_core::HeapId;
use heapscope_graph::{EdgeFilter, NodeFilter, TraceDirection, DEFAULT_USER_ID_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name looked up under the user's config directory.
const PLAN_FILE: &str = "plan.json";

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("failed to read plan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum PlanQuery {
    Summary,
    NodesWithRepr,
    /// Uses the plan's `symbols` when no list is given.
    NodesWithReprIn {
        #[serde(default)]
        symbols: Option<Vec<String>>,
    },
    NodesWithPosition,
    NodesWithType {
        #[serde(rename = "type")]
        kind: String,
    },
    EdgesWithName,
    /// Uses the plan's `symbols` when no list is given.
    EdgesWithNameIn {
        #[serde(default)]
        symbols: Option<Vec<String>>,
    },
    Roots,
    Leaves,
    Unlinked,
    ManyTo {
        at_least: usize,
    },
    ManyFrom {
        at_least: usize,
    },
    SizeAbove {
        bytes: u64,
    },
    TraceUp {
        id: HeapId,
    },
    TraceDown {
        id: HeapId,
    },
    Retained {
        id: HeapId,
    },
    Common {
        first: HeapId,
        second: HeapId,
        #[serde(default = "default_direction")]
        direction: TraceDirection,
    },
    Paths {
        from: HeapId,
        to: HeapId,
        #[serde(default)]
        max_length: Option<usize>,
    },
}

fn default_direction() -> TraceDirection {
    TraceDirection::Up
}

/// A filter listing, resolved against the plan's symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Nodes(NodeFilter),
    Edges(EdgeFilter),
}

impl PlanQuery {
    /// The filter listing this step runs, if it is one.
    pub fn listing(&self, symbols: &[String]) -> Option<Listing> {
        let or_plan = |list: &Option<Vec<String>>| list.clone().unwrap_or_else(|| symbols.to_vec());

        let listing = match self {
            PlanQuery::NodesWithRepr => Listing::Nodes(NodeFilter::WithRepr),
            PlanQuery::NodesWithReprIn { symbols } => Listing::Nodes(NodeFilter::ReprIn {
                symbols: or_plan(symbols),
            }),
            PlanQuery::NodesWithPosition => Listing::Nodes(NodeFilter::WithPosition),
            PlanQuery::NodesWithType { kind } => {
                Listing::Nodes(NodeFilter::OfType { kind: kind.clone() })
            }
            PlanQuery::EdgesWithName => Listing::Edges(EdgeFilter::WithName),
            PlanQuery::EdgesWithNameIn { symbols } => Listing::Edges(EdgeFilter::NameIn {
                symbols: or_plan(symbols),
            }),
            PlanQuery::Roots => Listing::Nodes(NodeFilter::Roots),
            PlanQuery::Leaves => Listing::Nodes(NodeFilter::Leaves),
            PlanQuery::Unlinked => Listing::Nodes(NodeFilter::Unlinked),
            PlanQuery::ManyTo { at_least } => Listing::Nodes(NodeFilter::ManyTo {
                at_least: *at_least,
            }),
            PlanQuery::ManyFrom { at_least } => Listing::Nodes(NodeFilter::ManyFrom {
                at_least: *at_least,
            }),
            PlanQuery::SizeAbove { bytes } => {
                Listing::Nodes(NodeFilter::SizeAbove { bytes: *bytes })
            }
            _ => return None,
        };

        Some(listing)
    }
}

/// The full plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPlan {
    /// Source-code names to look for in reprs and edge names.
    pub symbols: Vec<String>,

    /// Listings hide ids below this unless verbose.
    pub user_id_threshold: u64,

    pub max_queue_length: Option<usize>,

    pub max_path_length: Option<usize>,

    pub queries: Vec<PlanQuery>,
}

impl Default for AnalysisPlan {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            user_id_threshold: DEFAULT_USER_ID_THRESHOLD,
            max_queue_length: None,
            max_path_length: None,
            queries: default_queries(),
        }
    }
}

fn default_queries() -> Vec<PlanQuery> {
    vec![
        PlanQuery::Summary,
        PlanQuery::NodesWithRepr,
        PlanQuery::NodesWithReprIn { symbols: None },
        PlanQuery::NodesWithPosition,
        PlanQuery::NodesWithType {
            kind: "Closure".to_string(),
        },
        PlanQuery::NodesWithType {
            kind: "Code".to_string(),
        },
        PlanQuery::NodesWithType {
            kind: "Sourcemap".to_string(),
        },
        PlanQuery::EdgesWithName,
        PlanQuery::EdgesWithNameIn { symbols: None },
        PlanQuery::Roots,
        PlanQuery::Leaves,
        PlanQuery::Unlinked,
        PlanQuery::ManyTo { at_least: 7 },
        PlanQuery::ManyFrom { at_least: 7 },
        PlanQuery::SizeAbove { bytes: 23 },
    ]
}

impl AnalysisPlan {
    /// Parses a plan from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Loads a plan file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the plan to use.
    ///
    /// An explicit path wins; otherwise `<config dir>/heapscope/plan.json`
    /// is used when present, and the built-in plan when not.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), PlanError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Some(path) = user_plan_path().filter(|p| p.exists()) {
            debug!("Using plan from {}", path.display());
            return Ok((Self::load(&path)?, Some(path)));
        }

        Ok((Self::default(), None))
    }
}

/// Where a user-wide plan lives, if the platform has a config directory.
pub fn user_plan_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("heapscope").join(PLAN_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_plan_lists_standard_filters() {
        let plan = AnalysisPlan::default();
        assert_eq!(plan.user_id_threshold, 0x100_0000);
        assert_eq!(plan.queries.first(), Some(&PlanQuery::Summary));
        assert!(plan.queries.contains(&PlanQuery::ManyTo { at_least: 7 }));
        assert!(plan
            .queries
            .iter()
            .all(|q| *q == PlanQuery::Summary || q.listing(&[]).is_some()));
    }

    #[test]
    fn test_parse_plan() {
        let plan = AnalysisPlan::from_json(
            r#"{
                "symbols": ["myObject"],
                "max_queue_length": 50,
                "queries": [
                    {"query": "trace_up", "id": 279545795},
                    {"query": "common", "first": 1, "second": 2},
                    {"query": "paths", "from": 1, "to": 2, "max_length": 4},
                    {"query": "nodes_with_type", "type": "Closure"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.symbols, vec!["myObject".to_string()]);
        assert_eq!(plan.max_queue_length, Some(50));
        assert_eq!(plan.max_path_length, None);
        assert_eq!(plan.user_id_threshold, DEFAULT_USER_ID_THRESHOLD);
        assert_eq!(plan.queries[0], PlanQuery::TraceUp { id: 279545795 });
        assert_eq!(
            plan.queries[1],
            PlanQuery::Common {
                first: 1,
                second: 2,
                direction: TraceDirection::Up
            }
        );
        assert_eq!(
            plan.queries[2],
            PlanQuery::Paths {
                from: 1,
                to: 2,
                max_length: Some(4)
            }
        );
    }

    #[test]
    fn test_missing_queries_use_defaults() {
        let plan = AnalysisPlan::from_json(r#"{"symbols": ["a"]}"#).unwrap();
        assert_eq!(plan.queries, AnalysisPlan::default().queries);
    }

    #[test]
    fn test_unknown_query_is_rejected() {
        let result = AnalysisPlan::from_json(r#"{"queries": [{"query": "dominators"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_symbol_lists_fall_back_to_plan() {
        let symbols = vec!["myObject".to_string()];

        let listing = PlanQuery::NodesWithReprIn { symbols: None }.listing(&symbols);
        assert_eq!(
            listing,
            Some(Listing::Nodes(NodeFilter::ReprIn {
                symbols: symbols.clone()
            }))
        );

        let own = vec!["other".to_string()];
        let listing = PlanQuery::EdgesWithNameIn {
            symbols: Some(own.clone()),
        }
        .listing(&symbols);
        assert_eq!(
            listing,
            Some(Listing::Edges(EdgeFilter::NameIn { symbols: own }))
        );

        assert_eq!(PlanQuery::Retained { id: 1 }.listing(&symbols), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"queries": [{"query": "retained", "id": 9}]}"#)
            .unwrap();

        let plan = AnalysisPlan::load(file.path()).unwrap();
        assert_eq!(plan.queries, vec![PlanQuery::Retained { id: 9 }]);

        let (plan, source) = AnalysisPlan::discover(Some(file.path())).unwrap();
        assert_eq!(plan.queries.len(), 1);
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        let err = AnalysisPlan::load(file.path()).unwrap_err();
        assert!(matches!(err, PlanError::Parse { .. }));
    }
}
