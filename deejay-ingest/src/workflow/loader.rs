//! Record file loading
//!
//! Accepts the analyzer output as a JSON array of records or as JSON Lines
//! (one record object per line, blank lines ignored).

use crate::error::{LoadError, LoadResult};
use crate::types::SongRecord;
use std::path::Path;
use tracing::info;

pub fn load_records(path: &Path) -> LoadResult<Vec<SongRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_records(&content).map_err(|(line, source)| LoadError::Parse {
        path: path.to_path_buf(),
        line,
        source,
    })?;

    info!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records)
}

fn parse_records(content: &str) -> Result<Vec<SongRecord>, (usize, serde_json::Error)> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).map_err(|e| (0, e));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}
