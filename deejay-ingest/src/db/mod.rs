//! Catalog persistence: identity resolution, dimension upserts, relation links, DDL

pub mod albums;
pub mod artists;
pub mod dates;
pub mod identity;
pub mod relations;
pub mod schema;
pub mod songs;
pub mod upsert;

pub use albums::AlbumRow;
pub use artists::ArtistRow;
pub use dates::parse_date;
pub use identity::{find_identity, try_find_identity, EntityKind, Fingerprint, SqlValue};
pub use relations::{Link, RelationKind};
pub use schema::BatchReport;
pub use songs::SongRow;
pub use upsert::{insert_if_absent, upsert, DimensionRow, UpsertOutcome};
