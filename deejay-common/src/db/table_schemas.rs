//! Table Schema Definitions
//!
//! Single source of truth for the six persisted tables: three dimension
//! tables (song, artist, album) and three join tables. DDL, insert-column
//! order and natural keys are all read from here.

use crate::db::schema::{
    ColumnDefinition, SchemaDiff, SchemaDrift, SchemaIntrospector, SqlType, TableSchema,
};
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Classifier/regression feature columns of the song table, in column order
///
/// `valence` and `arousal` come from the two-element `valence_arousal` field;
/// the remaining names match the inbound record keys one to one.
pub const SONG_FEATURE_COLUMNS: &[&str] = &[
    "valence",
    "arousal",
    "danceable_not_danceable",
    "aggressive_non_aggressive",
    "happy_non_happy",
    "party_non_party",
    "relaxed_non_relaxed",
    "sad_non_sad",
    "acoustic_non_acoustic",
    "electronic_non_electronic",
    "instrumental_voice",
    "female_male",
    "bright_dark",
    "acoustic_electronic",
    "dry_wet",
    "bpm",
];

/// Song fingerprint: title plus two classifier ratios
///
/// Deliberately loose. Two songs with the same title and the same two
/// ratios are treated as one entity.
pub const SONG_FINGERPRINT: &[&str] = &["title", "happy_non_happy", "sad_non_sad"];

/// Song table schema
pub struct SongTableSchema;

impl TableSchema for SongTableSchema {
    fn table_name() -> &'static str {
        "song"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("comment", SqlType::Text),
            ColumnDefinition::new("title", SqlType::Text).not_null().indexed(),
        ];
        columns.extend(
            SONG_FEATURE_COLUMNS
                .iter()
                .map(|name| ColumnDefinition::new(name, SqlType::Real)),
        );
        columns
    }

    fn natural_key() -> &'static [&'static str] {
        SONG_FINGERPRINT
    }
}

/// Artist table schema
pub struct ArtistTableSchema;

impl TableSchema for ArtistTableSchema {
    fn table_name() -> &'static str {
        "artist"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("name", SqlType::Text).not_null().indexed(),
        ]
    }

    fn natural_key() -> &'static [&'static str] {
        &["name"]
    }
}

/// Album table schema
pub struct AlbumTableSchema;

impl TableSchema for AlbumTableSchema {
    fn table_name() -> &'static str {
        "album"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("title", SqlType::Text).not_null().indexed(),
            ColumnDefinition::new("date", SqlType::Date).not_null(),
        ]
    }

    fn natural_key() -> &'static [&'static str] {
        &["title", "date"]
    }
}

/// Song ↔ album join table (carries the track number)
pub struct SongAlbumTableSchema;

impl TableSchema for SongAlbumTableSchema {
    fn table_name() -> &'static str {
        "song_album"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("song_id", SqlType::Text)
                .not_null()
                .references_cascade("song", "id")
                .indexed(),
            ColumnDefinition::new("album_id", SqlType::Text)
                .not_null()
                .references_cascade("album", "id")
                .indexed(),
            ColumnDefinition::new("tracknumber", SqlType::Integer),
        ]
    }

    fn natural_key() -> &'static [&'static str] {
        &["song_id", "album_id"]
    }
}

/// Song ↔ artist join table
pub struct SongArtistTableSchema;

impl TableSchema for SongArtistTableSchema {
    fn table_name() -> &'static str {
        "song_artist"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("song_id", SqlType::Text)
                .not_null()
                .references_cascade("song", "id")
                .indexed(),
            ColumnDefinition::new("artist_id", SqlType::Text)
                .not_null()
                .references_cascade("artist", "id")
                .indexed(),
        ]
    }

    fn natural_key() -> &'static [&'static str] {
        &["song_id", "artist_id"]
    }
}

/// Album ↔ artist join table
pub struct AlbumArtistTableSchema;

impl TableSchema for AlbumArtistTableSchema {
    fn table_name() -> &'static str {
        "album_artist"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", SqlType::Text).primary_key(),
            ColumnDefinition::new("album_id", SqlType::Text)
                .not_null()
                .references_cascade("album", "id")
                .indexed(),
            ColumnDefinition::new("artist_id", SqlType::Text)
                .not_null()
                .references_cascade("artist", "id")
                .indexed(),
        ]
    }

    fn natural_key() -> &'static [&'static str] {
        &["album_id", "artist_id"]
    }
}

/// Closed set of persisted tables
///
/// Operator-supplied table names are parsed into this enum; SQL text is only
/// ever assembled from the static names it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Song,
    Artist,
    Album,
    SongAlbum,
    SongArtist,
    AlbumArtist,
}

impl Table {
    /// Creation order: dimension tables before the join tables referencing them
    pub const ALL: [Table; 6] = [
        Table::Song,
        Table::Artist,
        Table::Album,
        Table::SongAlbum,
        Table::SongArtist,
        Table::AlbumArtist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Song => SongTableSchema::table_name(),
            Table::Artist => ArtistTableSchema::table_name(),
            Table::Album => AlbumTableSchema::table_name(),
            Table::SongAlbum => SongAlbumTableSchema::table_name(),
            Table::SongArtist => SongArtistTableSchema::table_name(),
            Table::AlbumArtist => AlbumArtistTableSchema::table_name(),
        }
    }

    pub fn columns(self) -> Vec<ColumnDefinition> {
        match self {
            Table::Song => SongTableSchema::expected_columns(),
            Table::Artist => ArtistTableSchema::expected_columns(),
            Table::Album => AlbumTableSchema::expected_columns(),
            Table::SongAlbum => SongAlbumTableSchema::expected_columns(),
            Table::SongArtist => SongArtistTableSchema::expected_columns(),
            Table::AlbumArtist => AlbumArtistTableSchema::expected_columns(),
        }
    }

    pub fn natural_key(self) -> &'static [&'static str] {
        match self {
            Table::Song => SongTableSchema::natural_key(),
            Table::Artist => ArtistTableSchema::natural_key(),
            Table::Album => AlbumTableSchema::natural_key(),
            Table::SongAlbum => SongAlbumTableSchema::natural_key(),
            Table::SongArtist => SongArtistTableSchema::natural_key(),
            Table::AlbumArtist => AlbumArtistTableSchema::natural_key(),
        }
    }

    pub fn create_table_sql(self) -> String {
        match self {
            Table::Song => SongTableSchema::create_table_sql(),
            Table::Artist => ArtistTableSchema::create_table_sql(),
            Table::Album => AlbumTableSchema::create_table_sql(),
            Table::SongAlbum => SongAlbumTableSchema::create_table_sql(),
            Table::SongArtist => SongArtistTableSchema::create_table_sql(),
            Table::AlbumArtist => AlbumArtistTableSchema::create_table_sql(),
        }
    }

    pub fn index_sql(self) -> Vec<String> {
        match self {
            Table::Song => SongTableSchema::index_sql(),
            Table::Artist => ArtistTableSchema::index_sql(),
            Table::Album => AlbumTableSchema::index_sql(),
            Table::SongAlbum => SongAlbumTableSchema::index_sql(),
            Table::SongArtist => SongArtistTableSchema::index_sql(),
            Table::AlbumArtist => AlbumArtistTableSchema::index_sql(),
        }
    }

    pub fn unique_index_name(self) -> String {
        match self {
            Table::Song => SongTableSchema::unique_index_name(),
            Table::Artist => ArtistTableSchema::unique_index_name(),
            Table::Album => AlbumTableSchema::unique_index_name(),
            Table::SongAlbum => SongAlbumTableSchema::unique_index_name(),
            Table::SongArtist => SongArtistTableSchema::unique_index_name(),
            Table::AlbumArtist => AlbumArtistTableSchema::unique_index_name(),
        }
    }

    pub fn unique_index_sql(self) -> String {
        match self {
            Table::Song => SongTableSchema::unique_index_sql(),
            Table::Artist => ArtistTableSchema::unique_index_sql(),
            Table::Album => AlbumTableSchema::unique_index_sql(),
            Table::SongAlbum => SongAlbumTableSchema::unique_index_sql(),
            Table::SongArtist => SongArtistTableSchema::unique_index_sql(),
            Table::AlbumArtist => AlbumArtistTableSchema::unique_index_sql(),
        }
    }

    /// Column names in insert order
    pub fn column_names(self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.name).collect()
    }

    pub fn is_relation(self) -> bool {
        matches!(self, Table::SongAlbum | Table::SongArtist | Table::AlbumArtist)
    }

    /// Tables holding a foreign key to this one
    pub fn referenced_by(self) -> Vec<Table> {
        Table::ALL
            .into_iter()
            .filter(|t| {
                t.columns()
                    .iter()
                    .any(|c| c.references.is_some_and(|fk| fk.table == self.name()))
            })
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Table::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown table '{}'", s)))
    }
}

/// Compare every declared table against the live database
///
/// Report only; nothing is altered.
pub async fn verify_all(pool: &SqlitePool) -> Result<Vec<SchemaDrift>> {
    let mut drift = Vec::new();

    for table in Table::ALL {
        if !SchemaIntrospector::table_exists(pool, table.name()).await? {
            drift.push(SchemaDrift::MissingTable {
                table: table.name().to_string(),
            });
            continue;
        }

        let actual = SchemaIntrospector::introspect_table(pool, table.name()).await?;
        drift.extend(SchemaDiff::compare(table.name(), &table.columns(), &actual));
    }

    if drift.is_empty() {
        debug!("Schema verification: all {} tables match", Table::ALL.len());
    } else {
        for d in &drift {
            warn!("Schema drift: {}", d);
        }
    }

    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_columns_in_order() {
        let names = Table::Song.column_names();

        assert_eq!(names[0], "id");
        assert_eq!(names[1], "comment");
        assert_eq!(names[2], "title");
        assert_eq!(names[3], "valence");
        assert_eq!(names[4], "arousal");
        assert_eq!(*names.last().unwrap(), "bpm");
        assert_eq!(names.len(), 3 + SONG_FEATURE_COLUMNS.len());
    }

    #[test]
    fn test_fingerprint_columns_are_declared() {
        let names = Table::Song.column_names();
        for column in SONG_FINGERPRINT {
            assert!(names.contains(column), "{} not declared", column);
        }
    }

    #[test]
    fn test_relation_tables_cascade() {
        for table in [Table::SongAlbum, Table::SongArtist, Table::AlbumArtist] {
            let sql = table.create_table_sql();
            assert_eq!(sql.matches("ON DELETE CASCADE").count(), 2, "{}", sql);
            assert!(table.is_relation());
        }
        assert!(!Table::Song.is_relation());
    }

    #[test]
    fn test_referenced_by() {
        assert_eq!(Table::Song.referenced_by(), vec![Table::SongAlbum, Table::SongArtist]);
        assert_eq!(Table::Album.referenced_by(), vec![Table::SongAlbum, Table::AlbumArtist]);
        assert_eq!(Table::Artist.referenced_by(), vec![Table::SongArtist, Table::AlbumArtist]);
        assert!(Table::SongAlbum.referenced_by().is_empty());
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("song_artist".parse::<Table>().unwrap(), Table::SongArtist);
        assert_eq!(" ALBUM ".parse::<Table>().unwrap(), Table::Album);
        assert!("song; DROP TABLE album".parse::<Table>().is_err());
        assert!("songs".parse::<Table>().is_err());
    }

    #[test]
    fn test_unique_index_names() {
        assert_eq!(Table::Album.unique_index_name(), "uq_album_title_date");
        assert_eq!(
            Table::SongAlbum.unique_index_name(),
            "uq_song_album_song_id_album_id"
        );
    }
}
