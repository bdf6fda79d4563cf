//! Artist persistence

use crate::db::identity::{EntityKind, Fingerprint, SqlValue};
use crate::db::upsert::DimensionRow;
use crate::types::SongRecord;
use deejay_common::Result;

/// Artist row keyed by name
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub name: String,
    fingerprint: Fingerprint,
}

impl DimensionRow for ArtistRow {
    const KIND: EntityKind = EntityKind::Artist;

    /// Requires a non-blank `artist` field
    fn from_record(record: &SongRecord) -> Result<Self> {
        let fingerprint = Fingerprint::from_record(Self::KIND, record)?;
        Ok(Self {
            name: record.text("artist").unwrap_or_default(),
            fingerprint,
        })
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("name", SqlValue::Text(self.name.clone()))]
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}
