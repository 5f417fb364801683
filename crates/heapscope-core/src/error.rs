//! Errors raised while reading or decoding a snapshot.

use std::path::PathBuf;
use thiserror::Error;

/// A snapshot could not be read or decoded.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
