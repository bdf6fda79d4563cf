//! deejay-ingest library interface
//!
//! Persists analyzed song records into a deduplicated catalog of songs,
//! artists and albums plus their pairwise relations.

pub mod catalog;
pub mod db;
pub mod error;
pub mod types;
pub mod utils;
pub mod workflow;

pub use catalog::{Catalog, IngestReport};
pub use db::{EntityKind, RelationKind, UpsertOutcome};
pub use types::{RecordValue, SongRecord};
pub use workflow::{ingest_all, load_records, IngestSummary};
