//! Album persistence
//!
//! An album is identified by title and normalized release date. A record
//! without a usable date never creates an album.

use crate::db::identity::{EntityKind, Fingerprint, SqlValue};
use crate::db::upsert::DimensionRow;
use crate::types::SongRecord;
use chrono::NaiveDate;
use deejay_common::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRow {
    pub title: String,
    pub date: NaiveDate,
    fingerprint: Fingerprint,
}

impl DimensionRow for AlbumRow {
    const KIND: EntityKind = EntityKind::Album;

    fn from_record(record: &SongRecord) -> Result<Self> {
        let fingerprint = Fingerprint::from_record(Self::KIND, record)?;

        let (Some(SqlValue::Text(title)), Some(SqlValue::Date(date))) =
            (fingerprint.value("title"), fingerprint.value("date"))
        else {
            return Err(Error::Internal("album fingerprint lacks title/date".to_string()));
        };

        Ok(Self {
            title: title.clone(),
            date: *date,
            fingerprint,
        })
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("title", SqlValue::Text(self.title.clone())),
            ("date", SqlValue::Date(self.date)),
        ]
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_from_record() {
        let record = SongRecord::new()
            .with("album", "Satch Plays Fats")
            .with("date", "1955-06");

        let row = AlbumRow::from_record(&record).unwrap();

        assert_eq!(row.title, "Satch Plays Fats");
        assert_eq!(row.date, NaiveDate::from_ymd_opt(1955, 6, 1).unwrap());
    }

    #[test]
    fn test_album_preconditions() {
        let no_date = SongRecord::new().with("album", "M");
        let bad_date = SongRecord::new().with("album", "M").with("date", "12345");
        let no_title = SongRecord::new().with("date", "1999");

        assert!(matches!(AlbumRow::from_record(&no_date), Err(Error::InvalidInput(_))));
        assert!(matches!(AlbumRow::from_record(&bad_date), Err(Error::InvalidInput(_))));
        assert!(matches!(AlbumRow::from_record(&no_title), Err(Error::InvalidInput(_))));
    }
}
