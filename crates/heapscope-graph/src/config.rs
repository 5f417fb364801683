//! Per-query configuration.
//!
//! Every query takes a [`QueryConfig`] explicitly. Verbosity only decides
//! how much per-node and per-edge detail a query logs; results are the same
//! at every tier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default bound on the retained-set work queue.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 10_000;

/// Default bound on path length, in nodes.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 10;

/// How much diagnostic detail a query emits.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn is_silent(self) -> bool {
        self == Verbosity::Silent
    }

    pub fn is_verbose(self) -> bool {
        self == Verbosity::Verbose
    }

    /// The `tracing` filter directive matching this tier.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verbosity::Silent => "silent",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
        };
        write!(f, "{}", s)
    }
}

/// Settings threaded through each query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub verbosity: Verbosity,

    /// Retained-set computation fails once its queue grows past this.
    pub max_queue_length: usize,

    /// Path search abandons paths of this many nodes.
    pub max_path_length: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            max_queue_length: DEFAULT_MAX_QUEUE_LENGTH,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_queue_length(mut self, max_queue_length: usize) -> Self {
        self.max_queue_length = max_queue_length;
        self
    }

    pub fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }

    /// The same limits with all diagnostics suppressed.
    pub fn silenced(self) -> Self {
        self.with_verbosity(Verbosity::Silent)
    }

    pub(crate) fn verbose(&self) -> bool {
        self.verbosity.is_verbose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.max_queue_length, 10_000);
        assert_eq!(config.max_path_length, 10);
    }

    #[test]
    fn test_silenced_keeps_limits() {
        let config = QueryConfig::new()
            .with_max_queue_length(5)
            .with_verbosity(Verbosity::Verbose)
            .silenced();
        assert!(config.verbosity.is_silent());
        assert_eq!(config.max_queue_length, 5);
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(Verbosity::Silent < Verbosity::Normal);
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert_eq!(Verbosity::Verbose.filter_directive(), "debug");
    }
}
