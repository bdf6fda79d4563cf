//! Error types for deejay-ingest
//!
//! Catalog operations report failures through logs and absent results; the
//! errors here cover loading record files before anything reaches storage.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON; `line` is 1-based for JSON Lines input, 0 for a JSON array
    #[error("Malformed record in {path} (line {line}): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;
