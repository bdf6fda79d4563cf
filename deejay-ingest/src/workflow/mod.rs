//! Batch workflow: load analyzer output, ingest it into the catalog

pub mod ingest;
pub mod loader;

pub use ingest::{ingest_all, IngestSummary, Tally};
pub use loader::load_records;
