//! Song persistence
//!
//! A record is projected onto exactly the declared song columns. Tag
//! fields stored elsewhere (album, artist, date, tracknumber) and any key
//! the schema does not know are dropped.

use crate::db::identity::{EntityKind, Fingerprint, SqlValue};
use crate::db::upsert::DimensionRow;
use crate::types::SongRecord;
use deejay_common::db::SONG_FEATURE_COLUMNS;
use deejay_common::Result;
use tracing::debug;

/// Record field expanded into the `valence` and `arousal` columns
pub const VALENCE_AROUSAL_FIELD: &str = "valence_arousal";

/// Record fields persisted outside the song table
const ROUTED_ELSEWHERE: &[&str] = &["album", "artist", "date", "tracknumber"];

/// Song row projected from a record
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub comment: Option<String>,
    pub title: String,
    /// One value per entry of `SONG_FEATURE_COLUMNS`
    pub features: Vec<Option<f64>>,
    fingerprint: Fingerprint,
}

impl SongRow {
    pub fn feature(&self, column: &str) -> Option<f64> {
        SONG_FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.features[i])
    }
}

impl DimensionRow for SongRow {
    const KIND: EntityKind = EntityKind::Song;

    fn from_record(record: &SongRecord) -> Result<Self> {
        let fingerprint = Fingerprint::from_record(Self::KIND, record)?;

        let title = record
            .text("title")
            .unwrap_or_default();

        let pair = record.pair(VALENCE_AROUSAL_FIELD)?;
        let mut features = Vec::with_capacity(SONG_FEATURE_COLUMNS.len());
        for column in SONG_FEATURE_COLUMNS {
            let value = match (*column, pair) {
                ("valence", Some((valence, _))) => Some(valence),
                ("arousal", Some((_, arousal))) => Some(arousal),
                _ => record.number(column)?,
            };
            features.push(value);
        }

        let dropped: Vec<&str> = record
            .keys()
            .filter(|k| !is_song_field(k))
            .collect();
        if !dropped.is_empty() {
            debug!(title = %title, ?dropped, "Fields not stored on song");
        }

        Ok(Self {
            comment: record.text("comment"),
            title,
            features,
            fingerprint,
        })
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        let mut values = vec![
            (
                "comment",
                self.comment.clone().map(SqlValue::Text).unwrap_or(SqlValue::Null),
            ),
            ("title", SqlValue::Text(self.title.clone())),
        ];
        values.extend(
            SONG_FEATURE_COLUMNS
                .iter()
                .zip(&self.features)
                .map(|(column, value)| (*column, SqlValue::from_optional_real(*value))),
        );
        values
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

fn is_song_field(key: &str) -> bool {
    !ROUTED_ELSEWHERE.contains(&key)
        && (key == "comment"
            || key == "title"
            || key == VALENCE_AROUSAL_FIELD
            || SONG_FEATURE_COLUMNS.contains(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deejay_common::db::Table;
    use deejay_common::Error;

    fn record() -> SongRecord {
        SongRecord::new()
            .with("title", "I'm Crazy 'Bout My Baby - Edit")
            .with("artist", "Louis Armstrong")
            .with("album", "Satch Plays Fats")
            .with("date", "1955")
            .with("tracknumber", "")
            .with("comment:n", "Converted")
            .with("valence_arousal", (5.886054, 5.5037227))
            .with("happy_non_happy", 0.09090909090909091)
            .with("sad_non_sad", 0.18085106382978725)
            .with("lyrics", "la la")
    }

    #[test]
    fn test_projection_expands_valence_arousal() {
        let row = SongRow::from_record(&record()).unwrap();

        assert_eq!(row.feature("valence"), Some(5.886054));
        assert_eq!(row.feature("arousal"), Some(5.5037227));
        assert_eq!(row.feature("happy_non_happy"), Some(0.09090909090909091));
        assert_eq!(row.feature("bpm"), None);
        assert_eq!(row.comment.as_deref(), Some("Converted"));
    }

    #[test]
    fn test_values_follow_declared_columns() {
        let row = SongRow::from_record(&record()).unwrap();
        let values = row.values();

        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let declared = Table::Song.column_names();
        assert_eq!(columns, declared[1..].to_vec());
        assert!(!columns.contains(&"lyrics"));
        assert!(!columns.contains(&"album"));
    }

    #[test]
    fn test_missing_title_is_validation_failure() {
        let record = SongRecord::new().with("happy_non_happy", 0.5);
        assert!(matches!(SongRow::from_record(&record), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_feature_is_validation_failure() {
        let record = record().with("dry_wet", "very");
        assert!(matches!(SongRow::from_record(&record), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_song_fields() {
        assert!(is_song_field("bpm"));
        assert!(is_song_field("valence_arousal"));
        assert!(!is_song_field("tracknumber"));
        assert!(!is_song_field("composer"));
    }
}
